//! Service middleware for metrics and request tracking.
//!
//! ## Metrics Exposed
//!
//! Emitted as `tracing` events under `target: "hotel_reviews::metrics"`:
//!
//! - `request` - path pattern, method, status, latency
//! - `submission` - outcome of each review submission
//! - `token_verification` - emitted by the access guard
//!
//! Access logs go to `target: "hotel_reviews::access"`, one event per request,
//! keyed by the `x-request-id` correlation id.

use std::sync::OnceLock;
use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use regex_lite::Regex;
use tracing::{info, info_span, Instrument};

/// Correlation header read from the caller and echoed on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "hotel_reviews::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Request logging middleware that tags each request with a correlation id.
///
/// A caller-supplied `x-request-id` is kept when it is well formed, otherwise a
/// fresh UUID is used. Either way the id is returned in the response headers.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );
    let mut response = next.run(request).instrument(span).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    info!(
        target: "hotel_reviews::access",
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status,
        latency_ms = latency_ms,
        "request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Correlation id for a request: the caller's `x-request-id` or a new UUID.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| is_valid_request_id(id))
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn is_valid_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn path_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"^/api/reviews/hotel/[^/]+", "/api/reviews/hotel/:hotel_id"),
            (r"^/api/hotels/[^/]+", "/api/hotels/:hotel_id"),
            (r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}", ":id"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
        .collect()
    })
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Replaces hotel ids and UUIDs with placeholders.
fn normalize_path(path: &str) -> String {
    path_patterns()
        .iter()
        .fold(path.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

/// Record the outcome of a review submission.
pub fn record_submission(outcome: &str, latency_ms: u64) {
    info!(
        target: "hotel_reviews::metrics",
        metric_type = "submission",
        outcome = outcome,
        latency_ms = latency_ms,
        "submission_metric"
    );
}
