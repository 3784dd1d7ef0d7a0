pub mod identity;
pub mod memory_store;
