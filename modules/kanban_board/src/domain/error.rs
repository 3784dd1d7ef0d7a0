use thiserror::Error;

/// Failures reported by a document store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    #[error("live query failed: {message}")]
    Subscription { message: String },
}

impl StoreError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }
}

/// Failures reported by the identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("sign-in rejected for '{subject}'")]
    Rejected { subject: String },

    #[error("identity provider unavailable: {message}")]
    Unavailable { message: String },
}

impl AuthError {
    pub fn rejected(subject: impl Into<String>) -> Self {
        Self::Rejected {
            subject: subject.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Column title cannot be empty")]
    EmptyColumnTitle,

    #[error("Task text cannot be empty")]
    EmptyTaskText,

    #[error("No authenticated user")]
    Unauthenticated,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Write failed on '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Read failed on '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: StoreError,
    },
}

impl DomainError {
    pub fn write(path: impl ToString, source: StoreError) -> Self {
        Self::Write {
            path: path.to_string(),
            source,
        }
    }

    pub fn read(path: impl ToString, source: StoreError) -> Self {
        Self::Read {
            path: path.to_string(),
            source,
        }
    }

    /// A caller-supplied id that cannot name a document, e.g. blank or
    /// containing `/`.
    pub fn is_invalid_id(&self) -> bool {
        matches!(
            self,
            Self::Write {
                source: StoreError::InvalidPath { .. },
                ..
            } | Self::Read {
                source: StoreError::InvalidPath { .. },
                ..
            }
        )
    }

    /// Validation failures are expected no-ops, not faults.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyColumnTitle | Self::EmptyTaskText | Self::Unauthenticated
        ) || self.is_invalid_id()
    }
}
