pub mod atomic_metrics;

pub use atomic_metrics::AtomicMetrics;
