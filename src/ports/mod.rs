pub mod config_store;
pub mod metrics;
pub mod notifier;
pub mod scheduler;
pub mod store;
pub mod task_repository;

pub use config_store::*;
pub use metrics::*;
pub use notifier::*;
pub use scheduler::*;
pub use store::*;
pub use task_repository::*;
