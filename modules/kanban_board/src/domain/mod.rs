pub mod document;
pub mod error;
pub mod mapper;
pub mod mutations;
pub mod ports;
pub mod session;
pub mod subscriptions;
