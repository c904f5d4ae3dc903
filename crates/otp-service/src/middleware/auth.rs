//! Authentication middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, validates it
//! with the token issuer and injects the `TokenClaims` into request
//! extensions.

use crate::crypto::TokenClaims;
use crate::errors::OtpError;
use crate::services::AuthService;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<AuthService>,
}

/// Extract Bearer token from the Authorization header.
fn extract_bearer_token(req: &Request) -> Result<&str, OtpError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "otp.middleware.auth", "Missing Authorization header");
            OtpError::MissingAuthHeader
        })?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "otp.middleware.auth", "Invalid Authorization header format");
        OtpError::InvalidAuthFormat
    })
}

/// Authentication middleware for user tokens.
///
/// # Response
///
/// - Returns 401 Unauthorized if token is missing or invalid
/// - Continues to next handler with `TokenClaims` in extensions if token is valid
#[instrument(skip_all, name = "otp.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, OtpError> {
    let token = extract_bearer_token(&req)?;

    let claims = state.auth_service.validate_token(token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extension trait for extracting claims from request.
pub trait ClaimsExt {
    /// Returns `None` if auth middleware was not applied to this request.
    fn claims(&self) -> Option<&TokenClaims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&TokenClaims> {
        self.extensions().get::<TokenClaims>()
    }
}
