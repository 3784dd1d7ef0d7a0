// === PUBLIC CONTRACT ===
// Other crates consume the board through the contract module only.
pub mod contract;

pub use contract::{client, error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::KanbanBoard;

// === INTERNAL MODULES ===
// Exposed for testing and for wiring custom backends; not a stable API.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
