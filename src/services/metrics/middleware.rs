use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use super::MetricsRegistry;

/// Label used for requests that matched no route.
const UNMATCHED: &str = "unmatched";

/// Records count and latency per route template.
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRegistry>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let endpoint = endpoint_label(req.extensions().get::<MatchedPath>());

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics
        .http_requests_total
        .with_label_values(&[&method, &endpoint, &status])
        .inc();
    metrics
        .http_request_duration_seconds
        .with_label_values(&[&method, &endpoint])
        .observe(start.elapsed().as_secs_f64());

    response
}

/// Route templates such as `/event/{id}/approve` keep label cardinality
/// bounded no matter which ids clients send.
fn endpoint_label(matched: Option<&MatchedPath>) -> String {
    match matched {
        Some(path) if path.as_str().starts_with("/uploads") => "/uploads".to_string(),
        Some(path) => path.as_str().to_string(),
        None => UNMATCHED.to_string(),
    }
}
