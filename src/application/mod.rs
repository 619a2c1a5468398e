pub mod error;
pub mod format;
pub mod task_service;
pub mod verification;
pub mod watcher;

#[cfg(test)]
mod test_support;

pub use error::*;
pub use task_service::*;
pub use verification::*;
pub use watcher::*;
