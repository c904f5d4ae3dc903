//! Redis-backed ephemeral store.
//!
//! # Connection Pattern
//!
//! The redis-rs `MultiplexedConnection` is cheap to clone and safe to use
//! concurrently, so each operation clones it instead of sharing it behind a
//! lock.

use super::{lua_scripts, EphemeralStore, Replacement};
use crate::errors::OtpError;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Script};
use std::time::Duration;
use tracing::{error, instrument, warn};

#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    increment_below_script: Script,
    decrement_above_zero_script: Script,
    compare_and_swap_script: Script,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::Storage` if the URL is invalid or the connection
    /// cannot be established.
    pub async fn connect(redis_url: &str) -> Result<Self, OtpError> {
        let client = Client::open(redis_url).map_err(|e| {
            // Do NOT log redis_url, it may carry a password
            error!(target: "otp.store.redis", error = %e, "Failed to open Redis client");
            OtpError::Storage(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "otp.store.redis", error = %e, "Failed to connect to Redis");
                OtpError::Storage(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            increment_below_script: Script::new(lua_scripts::INCREMENT_BELOW),
            decrement_above_zero_script: Script::new(lua_scripts::DECREMENT_ABOVE_ZERO),
            compare_and_swap_script: Script::new(lua_scripts::COMPARE_AND_SWAP),
        })
    }
}

/// Redis TTLs are set in milliseconds; never pass 0 (Redis rejects it).
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn storage_error(operation: &'static str, e: redis::RedisError) -> OtpError {
    warn!(target: "otp.store.redis", error = %e, operation, "Redis operation failed");
    OtpError::Storage(format!("Redis {operation} failed: {e}"))
}

#[async_trait]
impl EphemeralStore for RedisStore {
    #[instrument(skip_all)]
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), OtpError> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| storage_error("set", e))?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn get(&self, key: &str) -> Result<Option<String>, OtpError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| storage_error("get", e))?;
        Ok(value)
    }

    #[instrument(skip_all)]
    async fn delete(&self, key: &str) -> Result<(), OtpError> {
        let mut conn = self.connection.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| storage_error("delete", e))?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn increment(&self, key: &str) -> Result<i64, OtpError> {
        let mut conn = self.connection.clone();
        let count: i64 = redis::cmd("INCR")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| storage_error("increment", e))?;
        Ok(count)
    }

    #[instrument(skip_all)]
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), OtpError> {
        let mut conn = self.connection.clone();
        let _: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| storage_error("expire", e))?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn increment_below(
        &self,
        key: &str,
        limit: i64,
        ttl: Duration,
    ) -> Result<Option<i64>, OtpError> {
        let mut conn = self.connection.clone();
        let result: i64 = self
            .increment_below_script
            .key(key)
            .arg(limit)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| storage_error("increment_below", e))?;

        Ok(if result < 0 { None } else { Some(result) })
    }

    #[instrument(skip_all)]
    async fn decrement_above_zero(&self, key: &str) -> Result<Option<i64>, OtpError> {
        let mut conn = self.connection.clone();
        let result: i64 = self
            .decrement_above_zero_script
            .key(key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| storage_error("decrement_above_zero", e))?;

        Ok(if result < 0 { None } else { Some(result) })
    }

    #[instrument(skip_all)]
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        replacement: Replacement<'_>,
    ) -> Result<bool, OtpError> {
        let mut conn = self.connection.clone();
        let (mode, value, ttl) = match replacement {
            Replacement::Delete => ("delete", "", 1),
            Replacement::Value { value, ttl } => ("set", value, ttl_millis(ttl)),
        };

        let result: i64 = self
            .compare_and_swap_script
            .key(key)
            .arg(expected)
            .arg(mode)
            .arg(value)
            .arg(ttl)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| storage_error("compare_and_swap", e))?;

        Ok(result == 1)
    }
}
