use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// OTP lifetime in seconds (2 minutes).
pub const OTP_TTL_SECONDS: i64 = 120;

/// Extra store-level lifetime of an OTP record past its `expires_at`.
///
/// The store keeps a record for `OTP_TTL_SECONDS + OTP_STORE_GRACE_SECONDS`
/// (3 minutes), so verification can still see it and report it as expired
/// before it is evicted.
pub const OTP_STORE_GRACE_SECONDS: i64 = 60;

/// Failed verifications allowed before an OTP is discarded.
pub const MAX_OTP_ATTEMPTS: u32 = 3;

/// OTP generation requests allowed per phone number per window.
pub const RATE_LIMIT_MAX_REQUESTS: i64 = 3;

/// Rate limit window in seconds (10 minutes).
pub const RATE_LIMIT_WINDOW_SECONDS: i64 = 600;

/// Bearer token lifetime in seconds (24 hours).
pub const TOKEN_EXPIRY_SECONDS: i64 = 86_400;

/// Default JWT clock skew tolerance in seconds (5 minutes).
pub const DEFAULT_JWT_CLOCK_SKEW_SECONDS: i64 = 300;

/// Maximum allowed JWT clock skew tolerance in seconds (10 minutes).
pub const MAX_JWT_CLOCK_SKEW_SECONDS: i64 = 600;

/// Minimum HS256 secret length in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: &str = "8080";
const DEFAULT_REDIS_ADDR: &str = "localhost:6379";

/// Which ephemeral store backs OTP records and rate counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    /// In-process store; single instance only, for local development.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub redis_url: SecretString,
    pub store_backend: StoreBackend,
    pub jwt_secret: SecretString,
    pub jwt_clock_skew_seconds: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),

    #[error("Invalid Redis configuration: {0}")]
    InvalidRedis(String),

    #[error("Invalid store backend: {0}")]
    InvalidStoreBackend(String),

    #[error("Invalid JWT clock skew: {0}")]
    InvalidJwtClockSkew(String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwt_secret = vars
            .get("JWT_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::InvalidJwtSecret(format!(
                "Expected at least {} bytes, got {}",
                MIN_JWT_SECRET_BYTES,
                jwt_secret.len()
            )));
        }

        let bind_address = match vars.get("BIND_ADDRESS") {
            Some(addr) => addr.clone(),
            None => {
                let port = vars.get("PORT").map(String::as_str).unwrap_or(DEFAULT_PORT);
                format!("{}:{}", DEFAULT_BIND_HOST, port)
            }
        };

        let redis_url = match vars.get("REDIS_URL") {
            Some(url) => url.clone(),
            None => redis_url_from_parts(vars)?,
        };

        let store_backend = match vars.get("OTP_STORE_BACKEND").map(String::as_str) {
            None | Some("redis") => StoreBackend::Redis,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidStoreBackend(format!(
                    "OTP_STORE_BACKEND must be 'redis' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let jwt_clock_skew_seconds = match vars.get("JWT_CLOCK_SKEW_SECONDS") {
            Some(value) => {
                let seconds: i64 = value.parse().map_err(|e| {
                    ConfigError::InvalidJwtClockSkew(format!(
                        "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                        value, e
                    ))
                })?;

                if seconds <= 0 || seconds > MAX_JWT_CLOCK_SKEW_SECONDS {
                    return Err(ConfigError::InvalidJwtClockSkew(format!(
                        "JWT_CLOCK_SKEW_SECONDS must be between 1 and {}, got {}",
                        MAX_JWT_CLOCK_SKEW_SECONDS, seconds
                    )));
                }
                seconds
            }
            None => DEFAULT_JWT_CLOCK_SKEW_SECONDS,
        };

        Ok(Config {
            bind_address,
            redis_url: SecretString::from(redis_url),
            store_backend,
            jwt_secret: SecretString::from(jwt_secret.clone()),
            jwt_clock_skew_seconds,
        })
    }
}

/// Assemble a Redis URL from REDIS_ADDR / REDIS_PASSWORD / REDIS_DB.
fn redis_url_from_parts(vars: &HashMap<String, String>) -> Result<String, ConfigError> {
    let addr = vars
        .get("REDIS_ADDR")
        .map(String::as_str)
        .unwrap_or(DEFAULT_REDIS_ADDR);

    let db: u32 = match vars.get("REDIS_DB") {
        Some(value) => value.parse().map_err(|e| {
            ConfigError::InvalidRedis(format!(
                "REDIS_DB must be a non-negative integer, got '{}': {}",
                value, e
            ))
        })?,
        None => 0,
    };

    Ok(match vars.get("REDIS_PASSWORD") {
        Some(password) if !password.is_empty() => {
            format!("redis://:{}@{}/{}", password, addr, db)
        }
        _ => format!("redis://{}/{}", addr, db),
    })
}
