//! Observability for the OTP auth service.
//!
//! # Privacy by Default
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit safe field
//! allow-listing. Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (enums, outcomes, counts, user ids)
//! - **HASHED**: Must be SHA-256 hashed for correlation (phone numbers)
//! - **NEVER**: Must never appear in logs (OTP codes, tokens, secrets)
//!
//! The only exception is [`crate::services::otp_sender::LogOtpSender`], the
//! development delivery sink, which writes the code to the log on purpose.

pub mod metrics;

use crate::errors::OtpError;
use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// Used for phone numbers, which need correlation across log entries but
/// should not be stored in plaintext.
///
/// # Privacy
///
/// This is NOT cryptographically secure for secrets - it's a one-way hash
/// for correlation purposes only. Phone numbers are enumerable, so the hash
/// is deliberately truncated.
pub fn hash_for_correlation(value: &str) -> String {
    let result = Sha256::digest(value.as_bytes());
    hex::encode(result.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// OTP and token failures (wrong code, expired, bad token)
    Authentication,
    /// Rate limiting
    Throttled,
    /// Malformed input, unknown or duplicate users
    Client,
    /// Store and system errors
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Throttled => "throttled",
            ErrorCategory::Client => "client",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&OtpError> for ErrorCategory {
    fn from(err: &OtpError) -> Self {
        match err {
            OtpError::OtpNotFound
            | OtpError::OtpExpired
            | OtpError::InvalidOtp
            | OtpError::TooManyAttempts
            | OtpError::InvalidToken(_)
            | OtpError::MissingAuthHeader
            | OtpError::InvalidAuthFormat => ErrorCategory::Authentication,
            OtpError::RateLimitExceeded => ErrorCategory::Throttled,
            OtpError::UserNotFound
            | OtpError::UserAlreadyExists
            | OtpError::InvalidRequest(_)
            | OtpError::MissingRequiredField(_)
            | OtpError::InvalidPhoneNumber(_)
            | OtpError::InvalidOtpFormat(_)
            | OtpError::InvalidUuid(_)
            | OtpError::InvalidPagination(_)
            | OtpError::InvalidSearchQuery(_) => ErrorCategory::Client,
            OtpError::RequestTimeout | OtpError::Storage(_) | OtpError::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }
}
