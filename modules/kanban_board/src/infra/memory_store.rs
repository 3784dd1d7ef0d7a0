use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::contract::model::DocumentId;
use crate::domain::document::{CollectionPath, Document, DocumentPath, Fields, OrderBy, Snapshot};
use crate::domain::error::StoreError;
use crate::domain::ports::{DocumentStore, SnapshotStream};

const DEFAULT_CHANGE_CAPACITY: usize = 256;

/// In-process hierarchical document store with live queries.
///
/// Each write broadcasts the path of the touched collection; live queries
/// re-read their collection when it matches and emit a full snapshot. A
/// lagging query skips straight to the current state, which is safe because
/// every emission replaces the previous one.
///
/// Deleting a document does not touch its subcollections.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    collections: RwLock<HashMap<CollectionPath, BTreeMap<DocumentId, Document>>>,
    changes: broadcast::Sender<CollectionPath>,
    clock: Mutex<Option<DateTime<Utc>>>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_change_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    /// `capacity` bounds the buffered change notifications per live query.
    pub fn with_change_capacity(capacity: usize) -> Self {
        let (changes, _rx) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(StoreInner {
                collections: RwLock::new(HashMap::new()),
                changes,
                clock: Mutex::new(None),
            }),
        }
    }

    /// Non-empty collections, in no particular order.
    pub fn collections(&self) -> Vec<CollectionPath> {
        self.inner.collections.read().keys().cloned().collect()
    }

    pub fn document_count(&self) -> usize {
        self.inner.collections.read().values().map(BTreeMap::len).sum()
    }
}

impl StoreInner {
    /// Strictly increasing server timestamps.
    fn server_timestamp(&self) -> DateTime<Utc> {
        let mut last = self.clock.lock();
        let now = Utc::now();
        let ts = match *last {
            Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
            _ => now,
        };
        *last = Some(ts);
        ts
    }

    fn snapshot(&self, collection: &CollectionPath, order: OrderBy) -> Snapshot {
        let mut documents: Vec<Document> = self
            .collections
            .read()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        order.sort(&mut documents);
        Snapshot { documents }
    }

    fn notify(&self, collection: &CollectionPath) {
        // no live queries is fine
        let _ = self.changes.send(collection.clone());
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<DocumentId, StoreError> {
        collection.validate()?;
        let id = DocumentId::new(Uuid::new_v4().simple().to_string());
        let document = Document {
            id: id.clone(),
            created_at: self.inner.server_timestamp(),
            fields,
        };

        self.inner
            .collections
            .write()
            .entry(collection.clone())
            .or_default()
            .insert(id.clone(), document);
        trace!(%collection, document_id = %id, "document created");

        self.inner.notify(collection);
        Ok(id)
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        path.validate()?;
        let collection = path.parent();
        let removed = {
            let mut collections = self.inner.collections.write();
            let removed = collections
                .get_mut(&collection)
                .and_then(|docs| docs.remove(&path.id()))
                .is_some();
            if collections.get(&collection).is_some_and(BTreeMap::is_empty) {
                collections.remove(&collection);
            }
            removed
        };

        if removed {
            trace!(%path, "document deleted");
            self.inner.notify(&collection);
        } else {
            trace!(%path, "delete of absent document");
        }
        Ok(())
    }

    async fn list(
        &self,
        collection: &CollectionPath,
        order: OrderBy,
    ) -> Result<Vec<Document>, StoreError> {
        collection.validate()?;
        Ok(self.inner.snapshot(collection, order).documents)
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        order: OrderBy,
    ) -> Result<SnapshotStream, StoreError> {
        collection.validate()?;

        // subscribe before reading so no change slips between the two
        let rx = self.inner.changes.subscribe();
        let initial = self.inner.snapshot(collection, order);
        debug!(%collection, count = initial.documents.len(), "live query opened");

        let seed = LiveQuery {
            inner: Arc::clone(&self.inner),
            path: collection.clone(),
            order,
            rx,
            pending: Some(initial),
        };

        Ok(stream::unfold(seed, |mut q| async move {
            if let Some(first) = q.pending.take() {
                return Some((Ok(first), q));
            }
            loop {
                match q.rx.recv().await {
                    Ok(changed) if changed == q.path => break,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(missed)) => {
                        debug!(path = %q.path, missed, "live query lagged, resending state");
                        break;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
            let snapshot = q.inner.snapshot(&q.path, q.order);
            Some((Ok(snapshot), q))
        })
        .boxed())
    }
}

struct LiveQuery {
    inner: Arc<StoreInner>,
    path: CollectionPath,
    order: OrderBy,
    rx: broadcast::Receiver<CollectionPath>,
    pending: Option<Snapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::UserId;
    use crate::domain::document::{columns_path, tasks_path};
    use crate::domain::mapper::{column_fields, task_fields};
    use std::time::Duration;
    use tokio::time::timeout;

    fn titles(snapshot: &Snapshot) -> Vec<String> {
        snapshot
            .documents
            .iter()
            .filter_map(|d| d.str_field("title").map(str::to_owned))
            .collect()
    }

    #[tokio::test]
    async fn create_assigns_ids_and_increasing_timestamps() {
        let store = InMemoryDocumentStore::new();
        let path = columns_path(&UserId::new("u1"));

        let a = store.create(&path, column_fields("A")).await.unwrap();
        let b = store.create(&path, column_fields("B")).await.unwrap();
        assert_ne!(a, b);

        let docs = store.list(&path, OrderBy::CreatedAtAsc).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].created_at < docs[1].created_at);
        assert_eq!(docs[0].id, a);
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_does_not_cascade() {
        let store = InMemoryDocumentStore::new();
        let user = UserId::new("u1");
        let col = store
            .create(&columns_path(&user), column_fields("A"))
            .await
            .unwrap();
        store
            .create(&tasks_path(&user, &col), task_fields("t"))
            .await
            .unwrap();

        let col_path = columns_path(&user).doc(&col);
        store.delete(&col_path).await.unwrap();
        store.delete(&col_path).await.unwrap();

        assert!(store.list(&columns_path(&user), OrderBy::CreatedAtAsc).await.unwrap().is_empty());
        // the task survives its parent
        assert_eq!(store.document_count(), 1);
        assert_eq!(store.collections(), vec![tasks_path(&user, &col)]);
    }

    #[tokio::test]
    async fn invalid_paths_are_rejected() {
        let store = InMemoryDocumentStore::new();
        let bad = columns_path(&UserId::new("a/b"));
        assert!(matches!(
            store.create(&bad, column_fields("x")).await,
            Err(StoreError::InvalidPath { .. })
        ));
        assert!(store.subscribe(&bad, OrderBy::CreatedAtAsc).await.is_err());
    }

    #[tokio::test]
    async fn live_query_emits_initial_then_full_replacements() {
        let store = InMemoryDocumentStore::new();
        let user = UserId::new("u1");
        let path = columns_path(&user);
        store.create(&path, column_fields("A")).await.unwrap();

        let mut live = store.subscribe(&path, OrderBy::CreatedAtAsc).await.unwrap();
        let first = timeout(Duration::from_secs(1), live.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(titles(&first), ["A"]);

        // writes elsewhere do not wake this query
        store
            .create(&columns_path(&UserId::new("other")), column_fields("X"))
            .await
            .unwrap();
        store.create(&path, column_fields("B")).await.unwrap();

        let next = timeout(Duration::from_secs(1), live.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(titles(&next), ["A", "B"]);
    }

    #[tokio::test]
    async fn lagging_query_catches_up_with_current_state() {
        let store = InMemoryDocumentStore::with_change_capacity(1);
        let path = columns_path(&UserId::new("u1"));
        let mut live = store.subscribe(&path, OrderBy::CreatedAtAsc).await.unwrap();
        let first = live.next().await.unwrap().unwrap();
        assert!(first.documents.is_empty());

        for title in ["A", "B", "C", "D"] {
            store.create(&path, column_fields(title)).await.unwrap();
        }

        let caught_up = timeout(Duration::from_secs(1), live.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(titles(&caught_up), ["A", "B", "C", "D"]);
    }
}
