use std::time::Duration;

/// Passive counters fed by the API client. Nothing reads them back on the request path.
pub trait MetricsSink: Send + Sync {
    fn inc_api_requests(&self);
    fn inc_api_errors(&self);
    fn update_latency(&self, latency: Duration);
}
