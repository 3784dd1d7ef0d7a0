//! One signed-in board: identity, live view and pending input drafts.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::contract::model::{BoardIntent, BoardView, DocumentId, UserId, UserIdentity};
use crate::domain::error::DomainError;
use crate::domain::mutations::MutationService;
use crate::domain::ports::{Credential, DocumentStore, IdentityProvider};
use crate::domain::subscriptions::SubscriptionManager;

/// Text typed into the board's inputs but not yet stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftInputs {
    pub column_title: String,
    pub task_text: HashMap<DocumentId, String>,
}

pub struct BoardSession {
    identity: Arc<dyn IdentityProvider>,
    subscriptions: SubscriptionManager,
    mutations: MutationService,
    user: Mutex<Option<UserIdentity>>,
    drafts: Mutex<DraftInputs>,
}

impl BoardSession {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            identity,
            subscriptions: SubscriptionManager::new(Arc::clone(&store)),
            mutations: MutationService::new(store),
            user: Mutex::new(None),
            drafts: Mutex::new(DraftInputs::default()),
        }
    }

    /// Authenticate and open the user's board.
    ///
    /// On failure nothing changes; a board already open stays open.
    #[instrument(name = "kanban_board.session.sign_in", skip_all, fields(subject = %credential.subject))]
    pub async fn sign_in(&self, credential: &Credential) -> Result<UserIdentity, DomainError> {
        let identity = self.identity.sign_in(credential).await.map_err(|e| {
            warn!(error = %e, "sign-in failed");
            DomainError::from(e)
        })?;

        self.subscriptions.close_all();
        *self.drafts.lock() = DraftInputs::default();
        *self.user.lock() = Some(identity.clone());
        self.subscriptions.open_columns(&identity.user_id);

        info!(user_id = %identity.user_id, "board session started");
        Ok(identity)
    }

    /// Tear the board down, then sign out with the provider. Idempotent.
    ///
    /// Subscriptions are closed and the view cleared even when the provider
    /// call fails.
    #[instrument(name = "kanban_board.session.sign_out", skip_all)]
    pub async fn sign_out(&self) -> Result<(), DomainError> {
        let user = self.user.lock().take();
        self.subscriptions.close_all();
        *self.drafts.lock() = DraftInputs::default();

        let Some(user) = user else {
            return Ok(());
        };
        self.identity.sign_out(&user).await?;
        info!(user_id = %user.user_id, "board session ended");
        Ok(())
    }

    /// Apply one user intent. Returns whether it took effect.
    pub async fn dispatch(&self, intent: BoardIntent) -> bool {
        let user = self.user_id();
        let user = user.as_ref();
        match intent {
            BoardIntent::AddColumn { title } => self.mutations.add_column(user, &title).await,
            BoardIntent::AddTask { column_id, text } => {
                self.mutations.add_task(user, &column_id, &text).await
            }
            BoardIntent::DeleteColumn { column_id } => {
                let done = self.mutations.delete_column(user, &column_id).await;
                if done {
                    self.drafts.lock().task_text.remove(&column_id);
                }
                done
            }
            BoardIntent::DeleteTask { column_id, task_id } => {
                self.mutations.delete_task(user, &column_id, &task_id).await
            }
            BoardIntent::Logout => match self.sign_out().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "sign-out failed");
                    false
                }
            },
        }
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.user.lock().clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.lock().as_ref().map(|u| u.user_id.clone())
    }

    pub fn view(&self) -> BoardView {
        self.subscriptions.view()
    }

    pub fn watch(&self) -> watch::Receiver<BoardView> {
        self.subscriptions.watch()
    }

    pub fn watcher_count(&self) -> usize {
        self.subscriptions.watcher_count()
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn mutations(&self) -> &MutationService {
        &self.mutations
    }

    pub fn drafts(&self) -> DraftInputs {
        self.drafts.lock().clone()
    }

    pub fn set_column_draft(&self, title: impl Into<String>) {
        self.drafts.lock().column_title = title.into();
    }

    pub fn set_task_draft(&self, column_id: &DocumentId, text: impl Into<String>) {
        self.drafts
            .lock()
            .task_text
            .insert(column_id.clone(), text.into());
    }

    /// Submit the column draft. It is cleared only once the store accepted it.
    pub async fn submit_column_draft(&self) -> bool {
        let title = self.drafts.lock().column_title.clone();
        let done = self
            .dispatch(BoardIntent::AddColumn {
                title: title.clone(),
            })
            .await;
        if done {
            let mut drafts = self.drafts.lock();
            // keep anything typed while the write was in flight
            if drafts.column_title == title {
                drafts.column_title.clear();
            }
        }
        done
    }

    /// Submit the task draft of one column, cleared once stored.
    pub async fn submit_task_draft(&self, column_id: &DocumentId) -> bool {
        let text = self
            .drafts
            .lock()
            .task_text
            .get(column_id)
            .cloned()
            .unwrap_or_default();
        let done = self
            .dispatch(BoardIntent::AddTask {
                column_id: column_id.clone(),
                text: text.clone(),
            })
            .await;
        if done {
            let mut drafts = self.drafts.lock();
            if drafts.task_text.get(column_id) == Some(&text) {
                drafts.task_text.remove(column_id);
            }
        }
        done
    }
}
