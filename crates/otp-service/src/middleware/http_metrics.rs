//! HTTP metrics middleware.
//!
//! Runs outside every other layer so framework-level rejections are
//! counted too: 415 for a wrong Content-Type, 422 or 400 for bodies
//! that fail to parse, 404 and 405 for unknown routes.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Records method, normalized path, status and duration for every response.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}
