use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for the events API. One registry per application
/// instance so test servers never collide on registration.
pub struct MetricsRegistry {
    registry: Registry,

    // HTTP Metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,

    // Auth Metrics
    pub auth_attempts_total: CounterVec,
    pub session_rotations_total: CounterVec,

    // Workflow Metrics
    pub event_actions_total: CounterVec,
    pub notifications_created_total: IntCounter,
    pub realtime_pushes_total: CounterVec,
}

impl MetricsRegistry {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests").namespace("campus_events"),
            &["method", "endpoint", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request duration")
                .namespace("campus_events")
                .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        let auth_attempts_total = CounterVec::new(
            Opts::new("auth_attempts_total", "Login attempts by outcome").namespace("campus_events"),
            &["outcome"],
        )?;
        registry.register(Box::new(auth_attempts_total.clone()))?;

        let session_rotations_total = CounterVec::new(
            Opts::new("session_rotations_total", "Refresh token rotations by outcome")
                .namespace("campus_events"),
            &["outcome"],
        )?;
        registry.register(Box::new(session_rotations_total.clone()))?;

        let event_actions_total = CounterVec::new(
            Opts::new("event_actions_total", "Committed event lifecycle actions")
                .namespace("campus_events"),
            &["action"],
        )?;
        registry.register(Box::new(event_actions_total.clone()))?;

        let notifications_created_total = IntCounter::with_opts(
            Opts::new("notifications_created_total", "Notification rows persisted")
                .namespace("campus_events"),
        )?;
        registry.register(Box::new(notifications_created_total.clone()))?;

        let realtime_pushes_total = CounterVec::new(
            Opts::new("realtime_pushes_total", "Real-time messages emitted")
                .namespace("campus_events"),
            &["event"],
        )?;
        registry.register(Box::new(realtime_pushes_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            auth_attempts_total,
            session_rotations_total,
            event_actions_total,
            notifications_created_total,
            realtime_pushes_total,
        }))
    }

    /// Export all metrics in Prometheus text format
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
