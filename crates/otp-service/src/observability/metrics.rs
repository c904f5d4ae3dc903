//! Metrics definitions for the OTP auth service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `otp_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: 2 values (success, error)
//! - `outcome`: verification outcomes (success plus one per error code)
//! - `action`: 2 values (allowed, rejected)
//! - `error_category`: 4 values (authentication, throttled, client, internal)
//! - `path`: known routes, `/api/v1/users/{id}`, or `/other`
//!
//! Phone numbers never appear as label values.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used to serve
/// `/metrics`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("otp_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("otp_token_issuance".to_string()),
            &[0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// OTP Metrics
// ============================================================================

/// Record an OTP generation request.
///
/// Metric: `otp_generation_total`
/// Labels: `status`
pub fn record_otp_generation(status: &str) {
    counter!("otp_generation_total", "status" => status.to_string()).increment(1);
}

/// Record an OTP verification outcome.
///
/// Metric: `otp_verification_total`
/// Labels: `outcome` (success, INVALID_OTP, OTP_EXPIRED, ...)
pub fn record_otp_verification(outcome: &str) {
    counter!("otp_verification_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// Rate Limiting Metrics
// ============================================================================

/// Record rate limit decision
///
/// Metric: `otp_rate_limit_decisions_total`
/// Labels: `action` (allowed, rejected, released)
pub fn record_rate_limit_decision(action: &str) {
    counter!("otp_rate_limit_decisions_total", "action" => action.to_string()).increment(1);
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance duration and outcome
///
/// Metric: `otp_token_issuance_duration_seconds`, `otp_token_issuance_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str, duration: Duration) {
    histogram!("otp_token_issuance_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("otp_token_issuance_total", "status" => status.to_string()).increment(1);
}

/// Record token validation result
///
/// Metric: `otp_token_validations_total`
/// Labels: `status`, `error_category`
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("otp_token_validations_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Record error by category
///
/// Metric: `otp_errors_total`
/// Labels: `operation`, `error_category`, `status_code`
pub fn record_error(operation: &str, error_category: &str, status_code: u16) {
    counter!("otp_errors_total",
        "operation" => operation.to_string(),
        "error_category" => error_category.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `otp_http_requests_total`, `otp_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("otp_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("otp_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Normalize path to prevent label cardinality explosion.
fn normalize_path(path: &str) -> String {
    match path {
        "/health"
        | "/metrics"
        | "/api/v1/auth/request-otp"
        | "/api/v1/auth/verify-otp"
        | "/api/v1/users" => path.to_string(),
        _ => match path.strip_prefix("/api/v1/users/") {
            Some(segment) if !segment.is_empty() && !segment.contains('/') => {
                "/api/v1/users/{id}".to_string()
            }
            _ => "/other".to_string(),
        },
    }
}
