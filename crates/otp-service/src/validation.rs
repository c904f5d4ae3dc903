//! Request input validation.
//!
//! Each validator trims surrounding whitespace and returns the normalized
//! value, or an input error whose variant names what was wrong and whose
//! detail explains it.

use crate::config::{DEFAULT_PAGE, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::errors::OtpError;
use crate::models::ListUsersQuery;
use uuid::Uuid;

const MIN_PHONE_LENGTH: usize = 10;
const MAX_PHONE_LENGTH: usize = 16;
const MIN_SEARCH_LENGTH: usize = 3;
const MAX_SEARCH_LENGTH: usize = 50;

/// Validated `GET /api/v1/users` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListUsersParams {
    pub page: usize,
    pub limit: usize,
    /// `None` when no search was given.
    pub search: Option<String>,
}

/// E.164: `+`, a non-zero digit, then 1-14 more digits; 10-16 chars overall.
pub fn validate_phone_number(phone_number: &str) -> Result<String, OtpError> {
    let phone_number = phone_number.trim();
    if phone_number.is_empty() {
        return Err(OtpError::MissingRequiredField(
            "phone_number is required".to_string(),
        ));
    }

    let well_formed = match phone_number.strip_prefix('+') {
        Some(digits) => {
            (2..=15).contains(&digits.len())
                && digits.bytes().all(|b| b.is_ascii_digit())
                && !digits.starts_with('0')
        }
        None => false,
    };

    if !well_formed {
        return Err(OtpError::InvalidPhoneNumber(format!(
            "phone number '{}' must be in international format (e.g., +1234567890)",
            phone_number
        )));
    }

    if !(MIN_PHONE_LENGTH..=MAX_PHONE_LENGTH).contains(&phone_number.len()) {
        return Err(OtpError::InvalidPhoneNumber(format!(
            "phone number length must be between {} and {} characters, got {}",
            MIN_PHONE_LENGTH,
            MAX_PHONE_LENGTH,
            phone_number.len()
        )));
    }

    Ok(phone_number.to_string())
}

/// Exactly six ASCII digits.
///
/// The rejected value is not echoed back; it may be a near-miss of the real
/// code.
pub fn validate_otp(otp: &str) -> Result<String, OtpError> {
    let otp = otp.trim();
    if otp.is_empty() {
        return Err(OtpError::MissingRequiredField("otp is required".to_string()));
    }

    if otp.len() != 6 || !otp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OtpError::InvalidOtpFormat(
            "OTP must be exactly 6 digits".to_string(),
        ));
    }

    Ok(otp.to_string())
}

/// Lowercase hyphenated UUID.
pub fn validate_user_id(user_id: &str) -> Result<Uuid, OtpError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(OtpError::MissingRequiredField(
            "user ID is required".to_string(),
        ));
    }

    match Uuid::try_parse(user_id) {
        // try_parse also accepts braced, simple and uppercase forms
        Ok(id) if id.hyphenated().to_string() == user_id => Ok(id),
        _ => Err(OtpError::InvalidUuid(format!(
            "invalid UUID format: '{}'",
            user_id
        ))),
    }
}

fn parse_positive(value: Option<&str>, default: usize, name: &str) -> Result<usize, OtpError> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(OtpError::InvalidPagination(format!(
                "invalid {} number",
                name
            ))),
        },
    }
}

/// Empty, or 3-50 chars of letters, digits, whitespace, `+`, `-`, `_`.
pub fn validate_search(search: &str) -> Result<Option<String>, OtpError> {
    let search = search.trim();
    if search.is_empty() {
        return Ok(None);
    }

    if search.len() < MIN_SEARCH_LENGTH {
        return Err(OtpError::InvalidSearchQuery(format!(
            "search query must be at least {} characters long",
            MIN_SEARCH_LENGTH
        )));
    }

    if search.len() > MAX_SEARCH_LENGTH {
        return Err(OtpError::InvalidSearchQuery(format!(
            "search query must be at most {} characters long",
            MAX_SEARCH_LENGTH
        )));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || c.is_whitespace() || "+-_".contains(c);
    if !search.chars().all(allowed) {
        return Err(OtpError::InvalidSearchQuery(
            "search query contains invalid characters".to_string(),
        ));
    }

    Ok(Some(search.to_string()))
}

/// Parse and validate list parameters, applying page/limit defaults.
pub fn validate_list_users(query: &ListUsersQuery) -> Result<ListUsersParams, OtpError> {
    let page = parse_positive(query.page.as_deref(), DEFAULT_PAGE, "page")?;
    let limit = parse_positive(query.limit.as_deref(), DEFAULT_PAGE_LIMIT, "limit")?;

    if limit > MAX_PAGE_LIMIT {
        return Err(OtpError::InvalidPagination(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }

    let search = validate_search(query.search.as_deref().unwrap_or(""))?;

    Ok(ListUsersParams {
        page,
        limit,
        search,
    })
}
