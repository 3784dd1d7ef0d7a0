use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::{KanbanBoardConfig, UserEntry};
use crate::contract::model::{UserId, UserIdentity};
use crate::domain::error::AuthError;
use crate::domain::ports::{Credential, IdentityProvider};

/// Identity provider backed by a configured allow-list.
///
/// The credential subject is the user id. Subjects not on the list are
/// accepted with the subject as display name when `allow_unknown_users` is
/// set, rejected otherwise.
pub struct StaticIdentityProvider {
    users: HashMap<String, String>,
    allow_unknown: bool,
}

impl StaticIdentityProvider {
    pub fn new(users: impl IntoIterator<Item = UserEntry>, allow_unknown: bool) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|u| {
                    let name = u.display_name.unwrap_or_else(|| u.user_id.clone());
                    (u.user_id, name)
                })
                .collect(),
            allow_unknown,
        }
    }

    pub fn from_config(cfg: &KanbanBoardConfig) -> Self {
        Self::new(cfg.users.iter().cloned(), cfg.allow_unknown_users)
    }

    /// Accepts any non-blank subject.
    pub fn open() -> Self {
        Self::new(Vec::new(), true)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn sign_in(&self, credential: &Credential) -> Result<UserIdentity, AuthError> {
        let subject = credential.subject.trim();
        if subject.is_empty() || subject.contains('/') {
            warn!(subject = %credential.subject, "sign-in rejected: malformed subject");
            return Err(AuthError::rejected(&credential.subject));
        }

        let display_name = match self.users.get(subject) {
            Some(name) => name.clone(),
            None if self.allow_unknown => subject.to_owned(),
            None => {
                warn!(subject, "sign-in rejected: unknown user");
                return Err(AuthError::rejected(subject));
            }
        };

        debug!(subject, "signed in");
        Ok(UserIdentity {
            user_id: UserId::new(subject),
            display_name,
        })
    }

    async fn sign_out(&self, user: &UserIdentity) -> Result<(), AuthError> {
        debug!(user_id = %user.user_id, "signed out");
        Ok(())
    }
}
