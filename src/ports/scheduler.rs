use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs deferred work after a delay, detached from the caller.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, job: Job);
}
