//! Ephemeral keyed store (OTP records and rate counters).
//!
//! # Key Patterns
//!
//! - `otp:{phone_number}` - OTP record (JSON)
//! - `rate_limit:{phone_number}` - OTP generation counter (integer)
//!
//! Keys embed phone numbers, so store implementations never log them.
//!
//! # Atomicity
//!
//! Besides plain get/set/delete/increment/expire, the store exposes compound
//! operations that execute as a single atomic step on the backend:
//! [`EphemeralStore::increment_below`] and
//! [`EphemeralStore::decrement_above_zero`] take and give back rate-limit
//! slots, and [`EphemeralStore::compare_and_swap`] covers OTP attempt
//! bookkeeping.

pub mod lua_scripts;
pub mod memory;
pub mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use crate::errors::OtpError;
use async_trait::async_trait;
use std::time::Duration;

/// Key holding the OTP record for a phone number.
pub fn otp_key(phone_number: &str) -> String {
    format!("otp:{phone_number}")
}

/// Key holding the OTP generation counter for a phone number.
pub fn rate_limit_key(phone_number: &str) -> String {
    format!("rate_limit:{phone_number}")
}

/// What [`EphemeralStore::compare_and_swap`] writes when the comparison holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement<'a> {
    /// Remove the key.
    Delete,
    /// Overwrite the value and reset the TTL.
    Value { value: &'a str, ttl: Duration },
}

/// Key-value store with per-key TTL and atomic counters.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), OtpError>;

    /// Fetch the value under `key`; `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, OtpError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), OtpError>;

    /// Increment the integer under `key` (missing counts as 0) and return the
    /// new value. An existing TTL is preserved.
    async fn increment(&self, key: &str) -> Result<i64, OtpError>;

    /// Reset the TTL of an existing key. No-op for a missing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), OtpError>;

    /// Atomically increment the counter under `key` only if its current value
    /// is below `limit`, resetting its TTL to `ttl` on success.
    ///
    /// Returns the new count, or `None` when the counter is already at the
    /// limit (the key is left untouched).
    async fn increment_below(
        &self,
        key: &str,
        limit: i64,
        ttl: Duration,
    ) -> Result<Option<i64>, OtpError>;

    /// Atomically decrement the counter under `key` if it is above zero. The
    /// TTL is left as is.
    ///
    /// Returns the new count, or `None` when the counter is missing or already
    /// at zero.
    async fn decrement_above_zero(&self, key: &str) -> Result<Option<i64>, OtpError>;

    /// Atomically apply `replacement` if the current value equals `expected`.
    ///
    /// Returns `false` (and changes nothing) when the key is missing or holds a
    /// different value.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        replacement: Replacement<'_>,
    ) -> Result<bool, OtpError>;
}
