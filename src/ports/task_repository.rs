use async_trait::async_trait;
use crate::domain::{Attachment, Comment, Task, TaskId};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Request construction failed: {0}")]
    Request(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Retry budget of {0:?} exceeded")]
    RetryBudgetExceeded(Duration),

    #[error("Request failed after retries")]
    RetriesExhausted,
}

impl RepositoryError {
    /// Transport failures, 5xx and 429 are worth another attempt; everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            RepositoryError::Network(_) => true,
            RepositoryError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// The remote board, as seen by the rest of the relay.
///
/// Calls complete only once the round trip and any retries are over.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Most recent tasks on the board, served from the local snapshot while it is fresh.
    async fn get_tasks(&self, limit: usize) -> RepositoryResult<Vec<Task>>;

    /// Creates the task and writes the board-assigned id back into `task`.
    async fn create_task(&self, task: &mut Task) -> RepositoryResult<()>;

    async fn update_task(&self, task: &Task) -> RepositoryResult<()>;

    async fn upload_attachment(
        &self,
        task_id: TaskId,
        attachment: &Attachment,
        data: &[u8],
    ) -> RepositoryResult<()>;

    async fn add_comment(&self, task_id: TaskId, comment: &Comment) -> RepositoryResult<()>;
}
