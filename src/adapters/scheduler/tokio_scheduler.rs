use crate::ports::{Job, Scheduler};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinSet};

#[derive(Default)]
struct Jobs {
    set: JoinSet<()>,
    /// One per spawned job, kept even while `drain` holds the set.
    handles: Vec<AbortHandle>,
}

impl Jobs {
    fn reap(&mut self) {
        while self.set.try_join_next().is_some() {}
        self.handles.retain(|handle| !handle.is_finished());
    }
}

/// Delayed jobs on the tokio runtime.
///
/// Jobs run to completion unless `shutdown` aborts them first.
#[derive(Default)]
pub struct TokioScheduler {
    jobs: Mutex<Jobs>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs scheduled and not yet finished, including any a `drain` is waiting on.
    pub fn pending(&self) -> usize {
        match self.jobs.lock() {
            Ok(mut jobs) => {
                jobs.reap();
                jobs.handles.len()
            }
            Err(_) => 0,
        }
    }

    /// Waits for every job, including ones scheduled by jobs while waiting.
    pub async fn drain(&self) {
        loop {
            let mut batch = match self.jobs.lock() {
                Ok(mut jobs) => std::mem::take(&mut jobs.set),
                Err(_) => return,
            };
            if batch.is_empty() {
                return;
            }
            while let Some(result) = batch.join_next().await {
                match result {
                    Ok(()) => {}
                    Err(e) if e.is_cancelled() => tracing::debug!("Scheduled job cancelled"),
                    Err(e) => tracing::error!("Scheduled job failed: {}", e),
                }
            }
        }
    }

    /// Aborts every pending job, a batch being drained included, and returns
    /// how many were dropped.
    pub fn shutdown(&self) -> usize {
        let pending = match self.jobs.lock() {
            Ok(mut jobs) => {
                jobs.reap();
                let pending = jobs.handles.len();
                for handle in jobs.handles.drain(..) {
                    handle.abort();
                }
                jobs.set.abort_all();
                pending
            }
            Err(_) => 0,
        };
        if pending > 0 {
            tracing::warn!("Dropped {} scheduled job(s) on shutdown", pending);
        }
        pending
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, job: Job) {
        match self.jobs.lock() {
            Ok(mut jobs) => {
                jobs.reap();
                let handle = jobs.set.spawn(async move {
                    tokio::time::sleep(delay).await;
                    job.await;
                });
                jobs.handles.push(handle);
            }
            Err(e) => tracing::error!("Scheduler lock poisoned, job dropped: {}", e),
        }
    }
}
