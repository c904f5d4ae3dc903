//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for bearer tokens and error bodies.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use uuid::Uuid;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    #[serde(default)]
    pub typ: Option<String>,
}

/// Bearer token claims as issued by the service
#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub user_id: Uuid,
    pub phone_number: String,
    pub iat: i64,
    pub exp: i64,
}

fn decode_part<T: for<'de> Deserialize<'de>>(token: &str, index: usize) -> T {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing part {}", index));
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT part {}: {}", index, e));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("Failed to parse JWT part {} JSON: {}", index, e))
}

/// Custom assertions for bearer tokens
///
/// Inspects the payload without verifying the signature; use the service's
/// own validation for that.
///
/// # Example
/// ```rust,ignore
/// login.token
///     .assert_valid_jwt()
///     .assert_for_user(login.user.id)
///     .assert_expires_in(86_400);
/// ```
pub trait TokenAssertions {
    /// Assert the token is a three-part HS256 JWT with the expected claims
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert the token is for the specified user ID
    fn assert_for_user(&self, user_id: Uuid) -> &Self;

    /// Assert the token carries the specified phone number
    fn assert_for_phone(&self, phone_number: &str) -> &Self;

    /// Assert `exp - iat` equals the specified lifetime in seconds
    fn assert_expires_in(&self, seconds: i64) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        assert_eq!(
            self.split('.').count(),
            3,
            "JWT must have 3 parts (header.payload.signature)"
        );

        let header: JwtHeader = decode_part(self, 0);
        assert_eq!(header.alg, "HS256", "Expected HS256 algorithm");
        assert_eq!(header.typ.as_deref(), Some("JWT"), "Expected JWT type");

        let _claims: JwtClaims = decode_part(self, 1);
        self
    }

    fn assert_for_user(&self, user_id: Uuid) -> &Self {
        let claims: JwtClaims = decode_part(self, 1);
        assert_eq!(claims.user_id, user_id, "Token is for a different user");
        self
    }

    fn assert_for_phone(&self, phone_number: &str) -> &Self {
        let claims: JwtClaims = decode_part(self, 1);
        assert_eq!(
            claims.phone_number, phone_number,
            "Token carries a different phone number"
        );
        self
    }

    fn assert_expires_in(&self, seconds: i64) -> &Self {
        let claims: JwtClaims = decode_part(self, 1);
        assert_eq!(
            claims.exp - claims.iat,
            seconds,
            "Token lifetime is {} seconds, expected {}",
            claims.exp - claims.iat,
            seconds
        );
        self
    }
}

/// Assert an error body has the `{"error":{"code","message"}}` shape and code
pub fn assert_error_code(body: &serde_json::Value, code: &str) {
    assert_eq!(
        body["error"]["code"], code,
        "Unexpected error body: {}",
        body
    );
    assert!(
        body["error"]["message"].is_string(),
        "Error body has no message: {}",
        body
    );
}
