//! Bearer-token sessions for the REST surface. Each token owns one
//! `BoardSession` and with it one live board.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::rest::error::{internal_error, unauthorized, ProblemResponse};
use crate::contract::model::UserIdentity;
use crate::domain::error::DomainError;
use crate::domain::ports::{Credential, DocumentStore, IdentityProvider};
use crate::domain::session::BoardSession;

struct SessionEntry {
    session: Arc<BoardSession>,
    last_seen: Mutex<Instant>,
}

impl SessionEntry {
    /// An open event stream keeps the session alive.
    fn is_idle(&self, ttl: Duration) -> bool {
        self.session.watcher_count() == 0 && self.last_seen.lock().elapsed() >= ttl
    }
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, SessionEntry>>,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    idle_ttl: Option<Duration>,
}

impl SessionRegistry {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            identity,
            store,
            idle_ttl: None,
        }
    }

    /// Sessions untouched for `ttl` with no open event stream become
    /// eligible for [`Self::reap_idle`]. `None` keeps them until sign-out.
    pub fn with_idle_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.idle_ttl = ttl;
        self
    }

    pub fn idle_ttl(&self) -> Option<Duration> {
        self.idle_ttl
    }

    /// Start a new session; the token is only issued once the board is open.
    pub async fn sign_in(&self, credential: &Credential) -> Result<(Uuid, UserIdentity), DomainError> {
        let session = Arc::new(BoardSession::new(
            Arc::clone(&self.identity),
            Arc::clone(&self.store),
        ));
        let user = session.sign_in(credential).await?;
        let token = Uuid::new_v4();
        self.sessions.insert(
            token,
            SessionEntry {
                session,
                last_seen: Mutex::new(Instant::now()),
            },
        );
        info!(user_id = %user.user_id, active = self.sessions.len(), "session issued");
        Ok((token, user))
    }

    /// Look a session up and mark it as used.
    pub fn get(&self, token: &Uuid) -> Option<Arc<BoardSession>> {
        self.sessions.get(token).map(|entry| {
            *entry.last_seen.lock() = Instant::now();
            Arc::clone(&entry.session)
        })
    }

    /// Unknown tokens are a no-op.
    pub async fn sign_out(&self, token: &Uuid) -> Result<(), DomainError> {
        let Some((_, entry)) = self.sessions.remove(token) else {
            return Ok(());
        };
        entry.session.sign_out().await
    }

    /// Sign out every idle session. Returns how many were reaped.
    pub async fn reap_idle(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let candidates: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|e| e.is_idle(ttl))
            .map(|e| *e.key())
            .collect();

        let mut reaped = 0;
        for token in candidates {
            // re-check under the shard lock; the session may have been used since
            let Some((_, entry)) = self.sessions.remove_if(&token, |_, e| e.is_idle(ttl)) else {
                continue;
            };
            if let Err(e) = entry.session.sign_out().await {
                warn!(error = %e, "sign-out of idle session failed");
            }
            reaped += 1;
        }
        if reaped > 0 {
            info!(reaped, active = self.sessions.len(), "idle sessions reaped");
        }
        reaped
    }

    /// Run [`Self::reap_idle`] every `every` on the current runtime.
    pub fn spawn_reaper(&self, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(every);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let reaped = registry.reap_idle().await;
                debug!(reaped, "idle session sweep");
            }
        })
    }

    /// Sign every session out, used on shutdown.
    pub async fn sign_out_all(&self) {
        let tokens: Vec<Uuid> = self.sessions.iter().map(|e| *e.key()).collect();
        for token in tokens {
            if let Err(e) = self.sign_out(&token).await {
                warn!(error = %e, "sign-out during shutdown failed");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// `Authorization: Bearer <session>` header.
#[derive(Debug, Clone, Copy)]
pub struct BearerToken(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| unauthorized("Missing bearer session token"))?;
        Uuid::parse_str(raw.trim())
            .map(BearerToken)
            .map_err(|_| unauthorized("Malformed session token"))
    }
}

/// The board session behind a valid bearer token.
pub struct CurrentSession(pub Arc<BoardSession>);

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let registry = parts
            .extensions
            .get::<SessionRegistry>()
            .ok_or_else(|| internal_error("Session registry is not configured"))?;
        registry
            .get(&token)
            .map(CurrentSession)
            .ok_or_else(|| unauthorized("Unknown or expired session"))
    }
}
