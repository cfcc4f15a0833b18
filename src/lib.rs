pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod node;
pub mod reconciler;
pub mod scheduler;
pub mod shutdown;
pub mod worker;
