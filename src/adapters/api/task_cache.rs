use crate::domain::Task;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CachedList {
    items: Vec<Task>,
    fetched_at: Instant,
}

/// Last full task listing from the board.
///
/// The snapshot is swapped whole on every successful fetch and handed out
/// as copies, so readers never alias each other's data. Writes to the board
/// do not invalidate it.
pub struct TaskCache {
    snapshot: RwLock<Option<CachedList>>,
    expiration: Duration,
}

impl TaskCache {
    pub fn new(expiration: Duration) -> Self {
        Self {
            snapshot: RwLock::new(None),
            expiration,
        }
    }

    /// A copy of the snapshot if it is non-empty and younger than the expiration window.
    pub async fn fresh(&self) -> Option<Vec<Task>> {
        let guard = self.snapshot.read().await;
        guard
            .as_ref()
            .filter(|cached| !cached.items.is_empty())
            .filter(|cached| cached.fetched_at.elapsed() < self.expiration)
            .map(|cached| cached.items.clone())
    }

    pub async fn replace(&self, items: Vec<Task>) {
        let mut guard = self.snapshot.write().await;
        *guard = Some(CachedList {
            items,
            fetched_at: Instant::now(),
        });
    }

    #[cfg(test)]
    pub async fn age(&self) -> Option<Duration> {
        self.snapshot
            .read()
            .await
            .as_ref()
            .map(|cached| cached.fetched_at.elapsed())
    }
}

impl Default for TaskCache {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRATION)
    }
}
