use axum::Router;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::rest::{routes, sessions::SessionRegistry};
use crate::config::KanbanBoardConfig;
use crate::contract::client::KanbanBoardApi;
use crate::domain::ports::{DocumentStore, IdentityProvider};
use crate::gateways::local::KanbanBoardLocalClient;
use crate::infra::identity::StaticIdentityProvider;
use crate::infra::memory_store::InMemoryDocumentStore;

/// The kanban board module: backends, sessions and REST surface.
pub struct KanbanBoard {
    config: KanbanBoardConfig,
    store: Arc<dyn DocumentStore>,
    sessions: SessionRegistry,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl KanbanBoard {
    /// In-memory store with the config-driven identity provider.
    pub fn new(config: KanbanBoardConfig) -> Self {
        let store = Arc::new(InMemoryDocumentStore::with_change_capacity(
            config.store_change_capacity,
        ));
        let identity = Arc::new(StaticIdentityProvider::from_config(&config));
        Self::with_backends(config, store, identity)
    }

    pub fn with_backends(
        config: KanbanBoardConfig,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let sessions = SessionRegistry::new(identity, Arc::clone(&store))
            .with_idle_ttl(config.session_idle_ttl());
        info!(
            known_users = config.users.len(),
            allow_unknown_users = config.allow_unknown_users,
            session_idle_ttl_secs = config.session_idle_ttl_secs,
            "kanban_board module initialized"
        );
        Self {
            config,
            store,
            sessions,
            reaper: Mutex::new(None),
        }
    }

    /// In-process client for other modules.
    pub fn client(&self) -> Arc<dyn KanbanBoardApi> {
        Arc::new(KanbanBoardLocalClient::new(Arc::clone(&self.store)))
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn config(&self) -> &KanbanBoardConfig {
        &self.config
    }

    pub fn register_rest(&self, router: Router) -> anyhow::Result<Router> {
        let router = routes::register_routes(router, self.sessions.clone(), &self.config)?;
        self.start_reaper();
        info!("kanban_board REST routes registered");
        Ok(router)
    }

    /// Start the idle-session sweep once, on the current runtime.
    fn start_reaper(&self) {
        let Some(ttl) = self.sessions.idle_ttl() else {
            return;
        };
        let mut reaper = self.reaper.lock();
        if reaper.is_some() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("no Tokio runtime; idle sessions will not be reaped");
            return;
        }
        let every = (ttl / 4).min(Duration::from_secs(60));
        *reaper = Some(self.sessions.spawn_reaper(every));
    }

    /// Stop the idle sweep and sign every open session out.
    pub async fn shutdown(&self) {
        let reaper = self.reaper.lock().take();
        if let Some(reaper) = reaper {
            reaper.abort();
        }
        let active = self.sessions.len();
        self.sessions.sign_out_all().await;
        info!(active, "kanban_board sessions closed");
    }
}

impl Drop for KanbanBoard {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.get_mut().take() {
            reaper.abort();
        }
    }
}
