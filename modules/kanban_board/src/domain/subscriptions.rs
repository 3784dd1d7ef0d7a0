//! Live, ordered view of one user's board.
//!
//! The manager owns one column subscription and, through the child registry,
//! at most one task subscription per listed column. Every snapshot replaces
//! the corresponding list wholesale; nothing is merged or inserted locally.
//!
//! All state transitions happen under a single lock, and a snapshot is only
//! applied while its handle is still registered. `close` removes the handle
//! under that lock, so once it returns nothing more is attributed to it.

use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::contract::model::{BoardView, DocumentId, UserId};
use crate::domain::document::{columns_path, tasks_path, CollectionPath, OrderBy, Snapshot};
use crate::domain::mapper::{columns_from_documents, tasks_from_documents};
use crate::domain::ports::DocumentStore;

/// Opaque handle of an open live query. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl std::fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Registered, no snapshot received yet.
    Pending,
    /// At least one snapshot applied.
    Live,
    /// The live query failed; the last applied snapshot stays visible.
    Failed,
    /// The store ended the live query.
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Columns {
        user_id: UserId,
    },
    Tasks {
        user_id: UserId,
        column_id: DocumentId,
    },
}

struct Entry {
    scope: Scope,
    status: SubscriptionStatus,
    pump: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct State {
    entries: HashMap<SubscriptionHandle, Entry>,
    columns: Option<SubscriptionHandle>,
    /// column id → its task subscription
    children: HashMap<DocumentId, SubscriptionHandle>,
    view: BoardView,
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    next_handle: AtomicU64,
    state: Mutex<State>,
    views: watch::Sender<BoardView>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for entry in self.state.get_mut().entries.values_mut() {
            if let Some(pump) = entry.pump.take() {
                pump.abort();
            }
        }
    }
}

/// Subscription manager for a single signed-in user.
///
/// `open_*` spawn their pump on the current Tokio runtime.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Inner>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (views, _) = watch::channel(BoardView::default());
        Self {
            inner: Arc::new(Inner {
                store,
                next_handle: AtomicU64::new(1),
                state: Mutex::new(State::default()),
                views,
            }),
        }
    }

    /// Live query over all columns of the user's board, ascending by creation time.
    ///
    /// A previously opened column subscription is closed first, together with
    /// all of its task subscriptions.
    #[instrument(name = "kanban_board.subscriptions.open_columns", skip_all, fields(user_id = %user_id))]
    pub fn open_columns(&self, user_id: &UserId) -> SubscriptionHandle {
        let mut state = self.inner.state.lock();
        if let Some(previous) = state.columns {
            debug!(%previous, "replacing column subscription");
            close_locked(&mut state, previous);
        }

        let scope = Scope::Columns {
            user_id: user_id.clone(),
        };
        let handle = self.inner.register(&mut state, scope, columns_path(user_id));
        state.columns = Some(handle);
        self.inner.publish(&state);
        info!(%handle, "column subscription opened");
        handle
    }

    /// Live query over one column's tasks, ascending by creation time.
    ///
    /// Registered in the child registry: a column has at most one task
    /// subscription, so opening it again returns the existing handle. It is
    /// closed automatically when the column leaves the column list.
    #[instrument(
        name = "kanban_board.subscriptions.open_tasks",
        skip_all,
        fields(user_id = %user_id, column_id = %column_id)
    )]
    pub fn open_tasks(&self, user_id: &UserId, column_id: &DocumentId) -> SubscriptionHandle {
        let mut state = self.inner.state.lock();
        let handle = self.inner.open_child(&mut state, user_id, column_id);
        self.inner.publish(&state);
        handle
    }

    /// Release a subscription. Idempotent; unknown handles are ignored.
    ///
    /// Closing the column subscription also closes every task subscription
    /// and clears the view.
    #[instrument(name = "kanban_board.subscriptions.close", skip(self), fields(handle = %handle))]
    pub fn close(&self, handle: SubscriptionHandle) {
        let mut state = self.inner.state.lock();
        if close_locked(&mut state, handle) {
            debug!("subscription closed");
            self.inner.publish(&state);
        }
    }

    /// Close every open subscription and clear the view.
    #[instrument(name = "kanban_board.subscriptions.close_all", skip(self))]
    pub fn close_all(&self) {
        let mut state = self.inner.state.lock();
        let handles: Vec<_> = state.entries.keys().copied().collect();
        for handle in handles {
            close_locked(&mut state, handle);
        }
        state.view = BoardView::default();
        self.inner.publish(&state);
        info!("all subscriptions closed");
    }

    /// Current view (a copy).
    pub fn view(&self) -> BoardView {
        self.inner.state.lock().view.clone()
    }

    /// Receiver that observes every published view.
    pub fn watch(&self) -> watch::Receiver<BoardView> {
        self.inner.views.subscribe()
    }

    /// Live receivers handed out by [`Self::watch`].
    pub fn watcher_count(&self) -> usize {
        self.inner.views.receiver_count()
    }

    pub fn status(&self, handle: SubscriptionHandle) -> Option<SubscriptionStatus> {
        self.inner
            .state
            .lock()
            .entries
            .get(&handle)
            .map(|e| e.status)
    }

    pub fn is_open(&self, handle: SubscriptionHandle) -> bool {
        self.inner.state.lock().entries.contains_key(&handle)
    }

    /// Number of open subscriptions, column and task ones together.
    pub fn open_count(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn columns_handle(&self) -> Option<SubscriptionHandle> {
        self.inner.state.lock().columns
    }

    pub fn task_subscription_of(&self, column_id: &DocumentId) -> Option<SubscriptionHandle> {
        self.inner.state.lock().children.get(column_id).copied()
    }
}

impl Inner {
    fn next_handle(&self) -> SubscriptionHandle {
        SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    fn register(
        self: &Arc<Self>,
        state: &mut State,
        scope: Scope,
        path: CollectionPath,
    ) -> SubscriptionHandle {
        let handle = self.next_handle();
        let pump = tokio::spawn(pump(
            Arc::downgrade(self),
            Arc::clone(&self.store),
            handle,
            path,
        ));
        state.entries.insert(
            handle,
            Entry {
                scope,
                status: SubscriptionStatus::Pending,
                pump: Some(pump),
            },
        );
        handle
    }

    fn open_child(
        self: &Arc<Self>,
        state: &mut State,
        user_id: &UserId,
        column_id: &DocumentId,
    ) -> SubscriptionHandle {
        if let Some(existing) = state.children.get(column_id) {
            return *existing;
        }
        let scope = Scope::Tasks {
            user_id: user_id.clone(),
            column_id: column_id.clone(),
        };
        let handle = self.register(state, scope, tasks_path(user_id, column_id));
        state.children.insert(column_id.clone(), handle);
        state
            .view
            .tasks_by_column
            .entry(column_id.clone())
            .or_default();
        debug!(%handle, %column_id, "task subscription opened");
        handle
    }

    /// Apply one snapshot. Returns false when the handle is no longer registered.
    fn apply(self: &Arc<Self>, handle: SubscriptionHandle, snapshot: Snapshot) -> bool {
        let mut state = self.state.lock();
        let scope = match state.entries.get_mut(&handle) {
            Some(entry) => {
                entry.status = SubscriptionStatus::Live;
                entry.scope.clone()
            }
            None => return false,
        };

        match scope {
            Scope::Columns { user_id } => {
                let columns = columns_from_documents(&snapshot.documents);
                let listed: HashSet<&DocumentId> = columns.iter().map(|c| &c.id).collect();

                // children of vanished columns go first, before the new list is visible
                let stale: Vec<SubscriptionHandle> = state
                    .children
                    .iter()
                    .filter(|(column_id, _)| !listed.contains(column_id))
                    .map(|(_, child)| *child)
                    .collect();
                for child in stale {
                    close_locked(&mut state, child);
                }
                for column in &columns {
                    self.open_child(&mut state, &user_id, &column.id);
                }

                debug!(%handle, count = columns.len(), "column snapshot applied");
                state.view.columns = columns;
            }
            Scope::Tasks { column_id, .. } => {
                let tasks = tasks_from_documents(&snapshot.documents);
                debug!(%handle, %column_id, count = tasks.len(), "task snapshot applied");
                state.view.tasks_by_column.insert(column_id, tasks);
            }
        }

        self.publish(&state);
        true
    }

    fn mark(&self, handle: SubscriptionHandle, status: SubscriptionStatus) {
        if let Some(entry) = self.state.lock().entries.get_mut(&handle) {
            entry.status = status;
            entry.pump = None;
        }
    }

    fn publish(&self, state: &State) {
        self.views.send_replace(state.view.clone());
    }
}

/// Remove `handle` and its view contribution. Returns false for unknown handles.
fn close_locked(state: &mut State, handle: SubscriptionHandle) -> bool {
    let Some(entry) = state.entries.remove(&handle) else {
        return false;
    };
    if let Some(pump) = entry.pump {
        pump.abort();
    }

    match entry.scope {
        Scope::Columns { .. } => {
            if state.columns == Some(handle) {
                state.columns = None;
            }
            let children: Vec<_> = state.children.drain().map(|(_, h)| h).collect();
            for child in children {
                if let Some(child_entry) = state.entries.remove(&child) {
                    if let Some(pump) = child_entry.pump {
                        pump.abort();
                    }
                }
            }
            state.view = BoardView::default();
        }
        Scope::Tasks { column_id, .. } => {
            if state.children.get(&column_id) == Some(&handle) {
                state.children.remove(&column_id);
                state.view.tasks_by_column.remove(&column_id);
            }
        }
    }
    true
}

async fn pump(
    inner: Weak<Inner>,
    store: Arc<dyn DocumentStore>,
    handle: SubscriptionHandle,
    path: CollectionPath,
) {
    let mut stream = match store.subscribe(&path, OrderBy::CreatedAtAsc).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(%handle, %path, error = %e, "failed to open live query");
            if let Some(inner) = inner.upgrade() {
                inner.mark(handle, SubscriptionStatus::Failed);
            }
            return;
        }
    };

    while let Some(item) = stream.next().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        match item {
            Ok(snapshot) => {
                if !inner.apply(handle, snapshot) {
                    return;
                }
            }
            Err(e) => {
                error!(%handle, %path, error = %e, "live query failed");
                inner.mark(handle, SubscriptionStatus::Failed);
                return;
            }
        }
    }

    debug!(%handle, %path, "live query ended by store");
    if let Some(inner) = inner.upgrade() {
        inner.mark(handle, SubscriptionStatus::Ended);
    }
}
