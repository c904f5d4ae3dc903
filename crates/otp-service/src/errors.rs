use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Domain errors for the OTP auth service.
///
/// Every variant maps to a stable machine-readable code (`code()`) and an
/// HTTP status hint (`status_code()`). Components return these unchanged
/// up through the orchestrator.
#[derive(Debug, Error)]
pub enum OtpError {
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("OTP not found")]
    OtpNotFound,

    #[error("OTP has expired")]
    OtpExpired,

    #[error("Invalid OTP provided")]
    InvalidOtp,

    #[error("Too many failed attempts")]
    TooManyAttempts,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("User not found")]
    UserNotFound,

    #[error("User with this phone number already exists")]
    UserAlreadyExists,

    #[error("Authorization header is required")]
    MissingAuthHeader,

    #[error("Invalid authorization header format")]
    InvalidAuthFormat,

    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    #[error("Required field is missing: {0}")]
    MissingRequiredField(String),

    #[error("Invalid phone number format: {0}")]
    InvalidPhoneNumber(String),

    #[error("Invalid OTP format: {0}")]
    InvalidOtpFormat(String),

    #[error("Invalid UUID format: {0}")]
    InvalidUuid(String),

    #[error("Invalid pagination parameters: {0}")]
    InvalidPagination(String),

    #[error("Invalid search query: {0}")]
    InvalidSearchQuery(String),

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OtpError {
    /// Stable error code surfaced to clients.
    pub fn code(&self) -> &'static str {
        match self {
            OtpError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            OtpError::OtpNotFound => "OTP_NOT_FOUND",
            OtpError::OtpExpired => "OTP_EXPIRED",
            OtpError::InvalidOtp => "INVALID_OTP",
            OtpError::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            OtpError::InvalidToken(_) => "INVALID_TOKEN",
            OtpError::UserNotFound => "USER_NOT_FOUND",
            OtpError::UserAlreadyExists => "USER_ALREADY_EXISTS",
            OtpError::MissingAuthHeader => "MISSING_AUTH_HEADER",
            OtpError::InvalidAuthFormat => "INVALID_AUTH_FORMAT",
            OtpError::InvalidRequest(_) => "INVALID_REQUEST",
            OtpError::MissingRequiredField(_) => "MISSING_REQUIRED_FIELD",
            OtpError::InvalidPhoneNumber(_) => "INVALID_PHONE_NUMBER",
            OtpError::InvalidOtpFormat(_) => "INVALID_OTP_FORMAT",
            OtpError::InvalidUuid(_) => "INVALID_UUID",
            OtpError::InvalidPagination(_) => "INVALID_PAGINATION",
            OtpError::InvalidSearchQuery(_) => "INVALID_SEARCH_QUERY",
            OtpError::RequestTimeout => "REQUEST_TIMEOUT",
            OtpError::Storage(_) => "STORAGE_ERROR",
            OtpError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Transport status hint for the request layer.
    pub fn status_code(&self) -> StatusCode {
        match self {
            OtpError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            OtpError::OtpNotFound
            | OtpError::OtpExpired
            | OtpError::InvalidOtp
            | OtpError::TooManyAttempts
            | OtpError::InvalidToken(_)
            | OtpError::MissingAuthHeader
            | OtpError::InvalidAuthFormat => StatusCode::UNAUTHORIZED,
            OtpError::UserNotFound => StatusCode::NOT_FOUND,
            OtpError::UserAlreadyExists => StatusCode::CONFLICT,
            OtpError::InvalidRequest(_)
            | OtpError::MissingRequiredField(_)
            | OtpError::InvalidPhoneNumber(_)
            | OtpError::InvalidOtpFormat(_)
            | OtpError::InvalidUuid(_)
            | OtpError::InvalidPagination(_)
            | OtpError::InvalidSearchQuery(_) => StatusCode::BAD_REQUEST,
            OtpError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            OtpError::Storage(_) | OtpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing detail for input errors.
    pub fn details(&self) -> Option<&str> {
        match self {
            OtpError::InvalidRequest(detail)
            | OtpError::MissingRequiredField(detail)
            | OtpError::InvalidPhoneNumber(detail)
            | OtpError::InvalidOtpFormat(detail)
            | OtpError::InvalidUuid(detail)
            | OtpError::InvalidPagination(detail)
            | OtpError::InvalidSearchQuery(detail) => Some(detail),
            _ => None,
        }
    }

    fn message(&self) -> String {
        match self {
            OtpError::RateLimitExceeded => {
                "Too many OTP requests. Please try again later.".to_string()
            }
            OtpError::InvalidToken(reason) => reason.clone(),
            OtpError::InvalidRequest(_) => "Invalid request body".to_string(),
            OtpError::MissingRequiredField(_) => "Required field is missing".to_string(),
            OtpError::InvalidPhoneNumber(_) => "Invalid phone number format".to_string(),
            OtpError::InvalidOtpFormat(_) => "Invalid OTP format".to_string(),
            OtpError::InvalidUuid(_) => "Invalid UUID format".to_string(),
            OtpError::InvalidPagination(_) => "Invalid pagination parameters".to_string(),
            OtpError::InvalidSearchQuery(_) => "Invalid search query".to_string(),
            // Backend details stay in the logs
            OtpError::Storage(_) => "An internal storage error occurred".to_string(),
            OtpError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for OtpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.message(),
                details: self.details().map(str::to_string),
            },
        };

        (status, Json(error_response)).into_response()
    }
}
