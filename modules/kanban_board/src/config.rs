use serde::{Deserialize, Serialize};

/// Configuration for the kanban_board module (`modules.kanban_board`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KanbanBoardConfig {
    /// Interval between SSE keepalive comments.
    #[serde(default = "default_sse_keepalive_secs")]
    pub sse_keepalive_secs: u64,
    /// Buffered change notifications per live query of the in-memory store.
    #[serde(default = "default_store_change_capacity")]
    pub store_change_capacity: usize,
    /// Sessions with no request and no open event stream for this long are
    /// signed out. `0` keeps them until an explicit sign-out.
    #[serde(default = "default_session_idle_ttl_secs")]
    pub session_idle_ttl_secs: u64,
    #[serde(default)]
    pub users: Vec<UserEntry>,
    /// Accept subjects missing from `users`.
    #[serde(default = "default_allow_unknown_users")]
    pub allow_unknown_users: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserEntry {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Default for KanbanBoardConfig {
    fn default() -> Self {
        Self {
            sse_keepalive_secs: default_sse_keepalive_secs(),
            store_change_capacity: default_store_change_capacity(),
            session_idle_ttl_secs: default_session_idle_ttl_secs(),
            users: Vec::new(),
            allow_unknown_users: default_allow_unknown_users(),
        }
    }
}

fn default_sse_keepalive_secs() -> u64 {
    15
}

fn default_store_change_capacity() -> usize {
    256
}

fn default_session_idle_ttl_secs() -> u64 {
    1800
}

fn default_allow_unknown_users() -> bool {
    true
}

impl KanbanBoardConfig {
    pub fn session_idle_ttl(&self) -> Option<std::time::Duration> {
        (self.session_idle_ttl_secs > 0)
            .then(|| std::time::Duration::from_secs(self.session_idle_ttl_secs))
    }
}
