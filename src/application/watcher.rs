use super::format::format_task_notification;
use super::AppResult;
use crate::ports::{Notifier, TaskRepository, TaskStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Polls the board and announces tasks the relay hasn't seen before.
pub struct NewTaskWatcher {
    repository: Arc<dyn TaskRepository>,
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
    check_interval: Duration,
    limit: usize,
}

impl NewTaskWatcher {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        store: Arc<dyn TaskStore>,
        notifier: Arc<dyn Notifier>,
        limit: usize,
    ) -> Self {
        Self {
            repository,
            store,
            notifier,
            check_interval: DEFAULT_CHECK_INTERVAL,
            limit,
        }
    }

    pub fn with_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// One pass over the latest tasks. Every unseen task becomes known;
    /// only the unfinished ones are announced. Returns how many were announced.
    pub async fn check_once(&self) -> AppResult<usize> {
        let tasks = self.repository.get_tasks(self.limit).await?;
        let chats = self.store.chat_ids();
        let mut announced = 0;

        for task in tasks {
            if self.store.is_known_task(task.id) {
                continue;
            }
            self.store.add_known_task(task.id);
            if task.done {
                tracing::debug!("Task {} is already done, not announcing", task.id);
                continue;
            }
            self.notifier
                .broadcast(&chats, &format_task_notification(&task))
                .await;
            announced += 1;
        }

        if announced > 0 {
            tracing::info!("Announced {} new tasks to {} chats", announced, chats.len());
        }
        Ok(announced)
    }

    /// Checks right away, then once per interval, until `shutdown` resolves.
    /// A failed check is logged and the next tick tries again.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Task watcher stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.check_once().await {
                        tracing::error!("Failed to check for new tasks: {}", e);
                    }
                }
            }
        }
    }
}
