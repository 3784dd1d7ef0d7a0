use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::contract::model::{DocumentId, UserIdentity};
use crate::domain::document::{CollectionPath, Document, DocumentPath, Fields, OrderBy, Snapshot};
use crate::domain::error::{AuthError, StoreError};

/// Long-lived live query. Every item is a complete, ordered replacement of the
/// queried set; the first item is the state at subscription time. Dropping the
/// stream releases the query.
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, StoreError>>;

/// Output port: hierarchical document store with live queries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a document under `collection`. The store assigns the id and `created_at`.
    async fn create(&self, collection: &CollectionPath, fields: Fields)
        -> Result<DocumentId, StoreError>;

    /// Remove exactly the document at `path`. Absent documents are not an error.
    /// Subcollections are left untouched.
    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError>;

    /// One-shot enumeration.
    async fn list(
        &self,
        collection: &CollectionPath,
        order: OrderBy,
    ) -> Result<Vec<Document>, StoreError>;

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        order: OrderBy,
    ) -> Result<SnapshotStream, StoreError>;
}

/// Sign-in material handed to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub subject: String,
}

impl Credential {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Output port: third-party identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, credential: &Credential) -> Result<UserIdentity, AuthError>;

    /// Idempotent.
    async fn sign_out(&self, user: &UserIdentity) -> Result<(), AuthError>;
}
