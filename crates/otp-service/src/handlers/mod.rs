//! HTTP request handlers.
//!
//! # Components
//!
//! - `auth_handler` - OTP request and verification
//! - `user_handler` - User lookup and listing (authenticated)
//! - `health` - Liveness probe
//! - `metrics` - Prometheus scrape endpoint

pub mod auth_handler;
pub mod health;
pub mod metrics;
pub mod user_handler;

pub use auth_handler::{request_otp, verify_otp};
pub use health::health_check;
pub use metrics::metrics_handler;
pub use user_handler::{get_user, list_users};

use crate::errors::OtpError;
use crate::observability::metrics::record_error;
use crate::observability::ErrorCategory;
use axum::extract::rejection::JsonRejection;

/// Map a JSON body rejection to the service's error format.
pub(crate) fn bad_body(rejection: JsonRejection) -> OtpError {
    OtpError::InvalidRequest(rejection.body_text())
}

/// Count a failed operation by category before it becomes a response.
pub(crate) fn observe_error(operation: &'static str) -> impl Fn(OtpError) -> OtpError {
    move |err| {
        record_error(
            operation,
            ErrorCategory::from(&err).as_str(),
            err.status_code().as_u16(),
        );
        err
    }
}
