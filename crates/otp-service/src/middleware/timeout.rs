//! Error body for requests cut off by the timeout layer.
//!
//! `tower_http::timeout::TimeoutLayer` answers with a bare 408. Handlers
//! never produce 408 themselves, so any 408 seen here came from the timeout
//! and is replaced with the standard error body.

use crate::errors::OtpError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rewrite a timeout response into `{"error":{"code","message"}}`.
///
/// Use with `axum::middleware::map_response`, directly outside the
/// `TimeoutLayer`.
pub async fn timeout_error_body(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        tracing::warn!(target: "otp.middleware.timeout", "Request timed out");
        return OtpError::RequestTimeout.into_response();
    }
    response
}
