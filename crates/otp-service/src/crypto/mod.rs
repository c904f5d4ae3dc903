//! Token issuing and OTP code generation.
//!
//! Bearer tokens are HS256 JWTs signed with the configured shared secret.
//! Expiry is checked against the injected [`Clock`] rather than by
//! `jsonwebtoken`, so the 24h lifetime can be exercised in tests.

use crate::clock::Clock;
use crate::config::TOKEN_EXPIRY_SECONDS;
use crate::errors::OtpError;
use crate::observability::metrics::record_token_validation;
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Maximum accepted token size in bytes (4KB).
///
/// Checked before any base64 decoding or signature work.
pub const MAX_JWT_SIZE_BYTES: usize = 4096;

/// Largest multiple of 1_000_000 that fits in a u32; draws at or above it are
/// rejected so `value % 1_000_000` stays uniform.
const OTP_SAMPLE_CEILING: u32 = 4_294_000_000;

const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// Bearer token claims.
///
/// A custom Debug implementation redacts the phone number.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub phone_number: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("user_id", &self.user_id)
            .field("phone_number", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

/// Mints and validates HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: SecretString,
    clock: Arc<dyn Clock>,
    clock_skew_seconds: i64,
}

impl TokenIssuer {
    pub fn new(secret: SecretString, clock: Arc<dyn Clock>, clock_skew_seconds: i64) -> Self {
        Self {
            secret,
            clock,
            clock_skew_seconds,
        }
    }

    /// Issue a token for `user_id`, valid for 24 hours from now.
    #[instrument(skip_all)]
    pub fn issue(&self, user_id: Uuid, phone_number: &str) -> Result<String, OtpError> {
        let now = self.clock.now();
        let claims = TokenClaims {
            user_id,
            phone_number: phone_number.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(TOKEN_EXPIRY_SECONDS)).timestamp(),
        };

        self.sign(&claims)
    }

    /// Sign arbitrary claims with the issuer's secret.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, OtpError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());

        let encoding_key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());

        encode(&header, claims, &encoding_key)
            .map_err(|e| OtpError::Internal(format!("JWT signing operation failed: {}", e)))
    }

    /// Validate a token and return its claims unchanged.
    ///
    /// Rejects oversized tokens, bad signatures, any algorithm other than
    /// HS256, tokens at or past `exp`, and tokens whose `iat` lies further in
    /// the future than the configured clock skew.
    #[instrument(skip_all)]
    pub fn validate(&self, token: &str) -> Result<TokenClaims, OtpError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "otp.crypto",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            record_token_validation("error", Some("size"));
            return Err(OtpError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string()));
        }

        let decoding_key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());

        // Pinning the algorithm rejects `none` and asymmetric headers
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        let token_data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "otp.crypto", error = %e, "Token verification failed");
            record_token_validation("error", Some("signature"));
            OtpError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
        })?;

        let claims = token_data.claims;
        let now = self.clock.now().timestamp();

        if now >= claims.exp {
            tracing::debug!(
                target: "otp.crypto",
                exp = claims.exp,
                now = now,
                "Token rejected: expired"
            );
            record_token_validation("error", Some("expired"));
            return Err(OtpError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string()));
        }

        let max_iat = now + self.clock_skew_seconds;
        if claims.iat > max_iat {
            tracing::debug!(
                target: "otp.crypto",
                iat = claims.iat,
                now = now,
                max_allowed = max_iat,
                clock_skew_seconds = self.clock_skew_seconds,
                "Token rejected: iat too far in the future"
            );
            record_token_validation("error", Some("clock_skew"));
            return Err(OtpError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string()));
        }

        record_token_validation("success", None);
        Ok(claims)
    }
}

/// Draw a uniformly distributed 6-digit code from the system CSPRNG.
#[instrument(skip_all)]
pub fn generate_otp_code() -> Result<String, OtpError> {
    let rng = SystemRandom::new();

    loop {
        let mut bytes = [0u8; 4];
        rng.fill(&mut bytes)
            .map_err(|e| OtpError::Internal(format!("Random bytes generation failed: {}", e)))?;

        let value = u32::from_be_bytes(bytes);
        if value < OTP_SAMPLE_CEILING {
            return Ok(format!("{:06}", value % 1_000_000));
        }
    }
}
