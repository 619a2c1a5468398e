use crate::ports::MetricsSink;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub api_requests: u64,
    pub api_errors: u64,
    #[serde(with = "millis")]
    pub average_latency: Duration,
}

mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

/// In-process counters behind the `MetricsSink` port.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    api_requests: AtomicU64,
    api_errors: AtomicU64,
    average_latency: RwLock<Duration>,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let average_latency = self
            .average_latency
            .read()
            .map(|guard| *guard)
            .unwrap_or_default();

        MetricsSnapshot {
            api_requests: self.api_requests.load(Ordering::Relaxed),
            api_errors: self.api_errors.load(Ordering::Relaxed),
            average_latency,
        }
    }
}

impl MetricsSink for AtomicMetrics {
    fn inc_api_requests(&self) {
        self.api_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_api_errors(&self) {
        self.api_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Running average that halves the weight of history on every sample.
    fn update_latency(&self, latency: Duration) {
        if let Ok(mut average) = self.average_latency.write() {
            *average = if average.is_zero() {
                latency
            } else {
                (*average + latency) / 2
            };
        }
    }
}
