pub mod api;
pub mod config;
pub mod metrics;
pub mod notify;
pub mod scheduler;
pub mod store;
