//! Middleware for the OTP service.
//!
//! # Components
//!
//! - `auth` - Bearer token check for the user directory routes
//! - `http_metrics` - HTTP request metrics middleware
//! - `timeout` - JSON error body for timed-out requests

pub mod auth;
pub mod http_metrics;
pub mod timeout;

pub use auth::{require_auth, AuthState, ClaimsExt};
pub use http_metrics::http_metrics_middleware;
pub use timeout::timeout_error_body;
