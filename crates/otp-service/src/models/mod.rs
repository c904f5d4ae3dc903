use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Registered user (lives in the user directory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub phone_number: String,
    pub registered_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    pub is_active: bool,
}

impl User {
    /// New active user registered (and logged in) at `now`.
    pub fn new(phone_number: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone_number: phone_number.into(),
            registered_at: now,
            last_login_at: now,
            is_active: true,
        }
    }
}

/// OTP record stored as JSON under `otp:{phone_number}`.
///
/// Debug is manually implemented to redact the code.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub phone_number: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
}

impl fmt::Debug for OtpRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpRecord")
            .field("phone_number", &"[REDACTED]")
            .field("code", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("attempts", &self.attempts)
            .finish()
    }
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RequestOtpRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOtpResponse {
    pub message: String,
    pub phone_number: String,
}

#[derive(Clone, Deserialize)]
pub struct VerifyOtpRequest {
    pub phone_number: String,
    pub otp: String,
}

impl fmt::Debug for VerifyOtpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyOtpRequest")
            .field("phone_number", &self.phone_number)
            .field("otp", &"[REDACTED]")
            .finish()
    }
}

/// Successful verification result.
#[derive(Clone, Serialize, Deserialize)]
pub struct VerifyOtpResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
    pub is_new_user: bool,
}

impl fmt::Debug for VerifyOtpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyOtpResponse")
            .field("message", &self.message)
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .field("is_new_user", &self.is_new_user)
            .finish()
    }
}

/// User as returned to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub phone_number: String,
    pub registered_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            phone_number: user.phone_number,
            registered_at: user.registered_at,
            last_login_at: user.last_login_at,
            is_active: user.is_active,
        }
    }
}

/// Query string for `GET /api/v1/users`.
///
/// Raw strings so malformed numbers surface as validation errors rather than
/// extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}
