//! Builder patterns for test data construction
//!
//! Provides a fluent API for minting bearer tokens the service did not
//! issue itself: expired, future-dated, wrongly signed.

use crate::test_ids::{TEST_JWT_SECRET, TEST_PHONE_ALICE, TEST_USER_ALICE};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use uuid::Uuid;

/// Builder for creating test bearer tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user(TEST_USER_BOB, TEST_PHONE_BOB)
///     .expires_in(-60)
///     .sign();
/// ```
pub struct TestTokenBuilder {
    user_id: Uuid,
    phone_number: String,
    exp: i64,
    iat: i64,
    secret: String,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    ///
    /// Defaults to Alice, issued now, valid for one hour, signed with
    /// `TEST_JWT_SECRET`.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            user_id: TEST_USER_ALICE,
            phone_number: TEST_PHONE_ALICE.to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            secret: TEST_JWT_SECRET.to_string(),
        }
    }

    /// Set the user the token is for
    pub fn for_user(mut self, user_id: Uuid, phone_number: &str) -> Self {
        self.user_id = user_id;
        self.phone_number = phone_number.to_string();
        self
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Sign with a different HS256 secret
    pub fn signed_with(mut self, secret: &str) -> Self {
        self.secret = secret.to_string();
        self
    }

    /// Build the claims as a JSON value
    pub fn build(&self) -> serde_json::Value {
        json!({
            "user_id": self.user_id,
            "phone_number": self.phone_number,
            "iat": self.iat,
            "exp": self.exp,
        })
    }

    /// Build and sign the token
    pub fn sign(self) -> String {
        let claims = self.build();
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("HS256 signing of JSON claims should not fail")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
