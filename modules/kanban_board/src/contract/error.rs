use thiserror::Error;

use crate::domain::error::DomainError;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KanbanError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Sign-in failed: {message}")]
    Auth { message: String },

    #[error("Internal error")]
    Internal,
}

impl KanbanError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<DomainError> for KanbanError {
    fn from(domain_error: DomainError) -> Self {
        use DomainError::*;
        match domain_error {
            EmptyColumnTitle => Self::validation("Column title cannot be empty"),
            EmptyTaskText => Self::validation("Task text cannot be empty"),
            Unauthenticated => Self::Unauthenticated,
            Auth(e) => Self::auth(e.to_string()),
            Write { .. } | Read { .. } => Self::internal(),
        }
    }
}
