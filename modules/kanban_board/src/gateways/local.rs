use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::KanbanBoardApi,
    error::KanbanError,
    model::{Column, DocumentId, Task, UserId},
};
use crate::domain::document::{columns_path, tasks_path, OrderBy};
use crate::domain::error::DomainError;
use crate::domain::mapper::{columns_from_documents, tasks_from_documents};
use crate::domain::mutations::MutationService;
use crate::domain::ports::DocumentStore;

/// Local implementation of the KanbanBoardApi trait that delegates to the domain layer
pub struct KanbanBoardLocalClient {
    store: Arc<dyn DocumentStore>,
    mutations: MutationService,
}

impl KanbanBoardLocalClient {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            mutations: MutationService::new(Arc::clone(&store)),
            store,
        }
    }
}

#[async_trait]
impl KanbanBoardApi for KanbanBoardLocalClient {
    async fn list_columns(&self, user: &UserId) -> Result<Vec<Column>, KanbanError> {
        let path = columns_path(user);
        let docs = self
            .store
            .list(&path, OrderBy::CreatedAtAsc)
            .await
            .map_err(|e| DomainError::read(&path, e))?;
        Ok(columns_from_documents(&docs))
    }

    async fn list_tasks(
        &self,
        user: &UserId,
        column_id: &DocumentId,
    ) -> Result<Vec<Task>, KanbanError> {
        let path = tasks_path(user, column_id);
        let docs = self
            .store
            .list(&path, OrderBy::CreatedAtAsc)
            .await
            .map_err(|e| DomainError::read(&path, e))?;
        Ok(tasks_from_documents(&docs))
    }

    async fn add_column(&self, user: &UserId, title: &str) -> Result<DocumentId, KanbanError> {
        Ok(self.mutations.try_add_column(Some(user), title).await?)
    }

    async fn add_task(
        &self,
        user: &UserId,
        column_id: &DocumentId,
        text: &str,
    ) -> Result<DocumentId, KanbanError> {
        Ok(self.mutations.try_add_task(Some(user), column_id, text).await?)
    }

    async fn delete_column(
        &self,
        user: &UserId,
        column_id: &DocumentId,
    ) -> Result<(), KanbanError> {
        Ok(self.mutations.try_delete_column(Some(user), column_id).await?)
    }

    async fn delete_task(
        &self,
        user: &UserId,
        column_id: &DocumentId,
        task_id: &DocumentId,
    ) -> Result<(), KanbanError> {
        Ok(self
            .mutations
            .try_delete_task(Some(user), column_id, task_id)
            .await?)
    }
}
