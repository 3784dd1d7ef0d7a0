use async_trait::async_trait;

use crate::contract::{
    error::KanbanError,
    model::{Column, DocumentId, Task, UserId},
};

/// Public API of the board for other in-process modules.
///
/// Writes return once the store acknowledged them; they never touch any
/// subscriber's view directly.
#[async_trait]
pub trait KanbanBoardApi: Send + Sync {
    /// Columns of the user's board in creation order
    async fn list_columns(&self, user: &UserId) -> Result<Vec<Column>, KanbanError>;

    /// Tasks of one column in creation order
    async fn list_tasks(
        &self,
        user: &UserId,
        column_id: &DocumentId,
    ) -> Result<Vec<Task>, KanbanError>;

    async fn add_column(&self, user: &UserId, title: &str) -> Result<DocumentId, KanbanError>;

    async fn add_task(
        &self,
        user: &UserId,
        column_id: &DocumentId,
        text: &str,
    ) -> Result<DocumentId, KanbanError>;

    /// Deletes every task of the column, then the column itself
    async fn delete_column(&self, user: &UserId, column_id: &DocumentId)
        -> Result<(), KanbanError>;

    async fn delete_task(
        &self,
        user: &UserId,
        column_id: &DocumentId,
        task_id: &DocumentId,
    ) -> Result<(), KanbanError>;
}
