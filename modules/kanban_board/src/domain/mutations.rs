use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::contract::model::{DocumentId, UserId};
use crate::domain::document::{column_path, columns_path, task_path, tasks_path, OrderBy};
use crate::domain::error::DomainError;
use crate::domain::mapper::{column_fields, task_fields};
use crate::domain::ports::DocumentStore;

/// Translates user intents into store writes.
///
/// Writes go straight to the store; open subscriptions pick the change up
/// from the store's next emission. The `try_*` methods report the failure,
/// the plain ones log it and answer "did it happen".
#[derive(Clone)]
pub struct MutationService {
    store: Arc<dyn DocumentStore>,
}

impl MutationService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[instrument(name = "kanban_board.mutations.add_column", skip_all, fields(user_id))]
    pub async fn try_add_column(
        &self,
        user: Option<&UserId>,
        title: &str,
    ) -> Result<DocumentId, DomainError> {
        let user = user.ok_or(DomainError::Unauthenticated)?;
        tracing::Span::current().record("user_id", tracing::field::display(user));
        if title.trim().is_empty() {
            return Err(DomainError::EmptyColumnTitle);
        }

        let path = columns_path(user);
        let id = self
            .store
            .create(&path, column_fields(title))
            .await
            .map_err(|e| DomainError::write(&path, e))?;
        info!(column_id = %id, "column created");
        Ok(id)
    }

    #[instrument(
        name = "kanban_board.mutations.add_task",
        skip_all,
        fields(user_id, column_id = %column_id)
    )]
    pub async fn try_add_task(
        &self,
        user: Option<&UserId>,
        column_id: &DocumentId,
        text: &str,
    ) -> Result<DocumentId, DomainError> {
        let user = user.ok_or(DomainError::Unauthenticated)?;
        tracing::Span::current().record("user_id", tracing::field::display(user));
        if text.trim().is_empty() {
            return Err(DomainError::EmptyTaskText);
        }

        let path = tasks_path(user, column_id);
        let id = self
            .store
            .create(&path, task_fields(text))
            .await
            .map_err(|e| DomainError::write(&path, e))?;
        info!(task_id = %id, "task created");
        Ok(id)
    }

    #[instrument(
        name = "kanban_board.mutations.delete_task",
        skip_all,
        fields(user_id, column_id = %column_id, task_id = %task_id)
    )]
    pub async fn try_delete_task(
        &self,
        user: Option<&UserId>,
        column_id: &DocumentId,
        task_id: &DocumentId,
    ) -> Result<(), DomainError> {
        let user = user.ok_or(DomainError::Unauthenticated)?;
        tracing::Span::current().record("user_id", tracing::field::display(user));

        let path = task_path(user, column_id, task_id);
        self.store
            .delete(&path)
            .await
            .map_err(|e| DomainError::write(&path, e))?;
        info!("task deleted");
        Ok(())
    }

    /// Cascading delete: every task of the column, then the column.
    ///
    /// Not atomic. A failure part-way leaves the column with fewer tasks;
    /// running it again picks up from there since deleted tasks no longer
    /// show up in the enumeration and deleting an absent document is a no-op.
    #[instrument(
        name = "kanban_board.mutations.delete_column",
        skip_all,
        fields(user_id, column_id = %column_id)
    )]
    pub async fn try_delete_column(
        &self,
        user: Option<&UserId>,
        column_id: &DocumentId,
    ) -> Result<(), DomainError> {
        let user = user.ok_or(DomainError::Unauthenticated)?;
        tracing::Span::current().record("user_id", tracing::field::display(user));

        let tasks = tasks_path(user, column_id);
        let children = self
            .store
            .list(&tasks, OrderBy::CreatedAtAsc)
            .await
            .map_err(|e| DomainError::read(&tasks, e))?;
        debug!(count = children.len(), "deleting column tasks");

        for task in &children {
            let path = tasks.doc(&task.id);
            self.store
                .delete(&path)
                .await
                .map_err(|e| DomainError::write(&path, e))?;
        }

        let path = column_path(user, column_id);
        self.store
            .delete(&path)
            .await
            .map_err(|e| DomainError::write(&path, e))?;
        info!(tasks_deleted = children.len(), "column deleted");
        Ok(())
    }

    pub async fn add_column(&self, user: Option<&UserId>, title: &str) -> bool {
        report("add_column", self.try_add_column(user, title).await)
    }

    pub async fn add_task(&self, user: Option<&UserId>, column_id: &DocumentId, text: &str) -> bool {
        report("add_task", self.try_add_task(user, column_id, text).await)
    }

    pub async fn delete_task(
        &self,
        user: Option<&UserId>,
        column_id: &DocumentId,
        task_id: &DocumentId,
    ) -> bool {
        report(
            "delete_task",
            self.try_delete_task(user, column_id, task_id).await,
        )
    }

    pub async fn delete_column(&self, user: Option<&UserId>, column_id: &DocumentId) -> bool {
        report("delete_column", self.try_delete_column(user, column_id).await)
    }
}

fn report<T>(op: &'static str, result: Result<T, DomainError>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) if e.is_validation() => {
            warn!(op, reason = %e, "mutation ignored");
            false
        }
        Err(e) => {
            error!(op, error = %e, "mutation failed");
            false
        }
    }
}
