//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "kobo_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "kobo_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "kobo_http_requests_in_flight";

    // Frame serving
    pub const FRAME_REQUESTS_TOTAL: &str = "kobo_frame_requests_total";

    // Stream run lifecycle
    pub const STREAM_STARTS_TOTAL: &str = "kobo_stream_starts_total";
    pub const STREAM_STOPS_TOTAL: &str = "kobo_stream_stops_total";
    pub const STREAM_FAILURES_TOTAL: &str = "kobo_stream_failures_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a frame fetch.
pub fn record_frame_request(served: bool) {
    let labels = [("served", served.to_string())];
    counter!(names::FRAME_REQUESTS_TOTAL, &labels).increment(1);
}

/// Record a started stream run.
pub fn record_stream_start() {
    counter!(names::STREAM_STARTS_TOTAL).increment(1);
}

/// Record a stopped stream run.
pub fn record_stream_stop() {
    counter!(names::STREAM_STOPS_TOTAL).increment(1);
}

/// Record a failed start or a crashed run.
pub fn record_stream_failure(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::STREAM_FAILURES_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels: streamer names are unbounded, so
/// collapse them into the route template.
fn sanitize_path(path: &str) -> String {
    if path.starts_with("/view/") {
        return "/view/:streamer".to_string();
    }
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/view/some_streamer"), "/view/:streamer");
        assert_eq!(sanitize_path("/frame.jpg"), "/frame.jpg");
        assert_eq!(sanitize_path("/api/stream/status"), "/api/stream/status");
    }
}
