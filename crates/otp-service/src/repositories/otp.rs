//! OTP lifecycle and per-number rate limiting on top of an [`EphemeralStore`].
//!
//! # Concurrency
//!
//! Rate-limit admission is a single [`EphemeralStore::increment_below`] call,
//! so concurrent generations for one number can never admit more than
//! [`RATE_LIMIT_MAX_REQUESTS`] per window. A slot whose code never reached
//! the store, or never reached the phone, is given back with
//! [`EphemeralStore::decrement_above_zero`].
//!
//! Verification is a read followed by [`EphemeralStore::compare_and_swap`]
//! against the exact JSON that was read. If another request changed the record
//! in between, the swap fails and verification starts over from a fresh read,
//! so the attempts counter is never lost and a correct code is consumed at
//! most once.

use crate::clock::Clock;
use crate::config::{
    MAX_OTP_ATTEMPTS, OTP_STORE_GRACE_SECONDS, OTP_TTL_SECONDS, RATE_LIMIT_MAX_REQUESTS,
    RATE_LIMIT_WINDOW_SECONDS,
};
use crate::crypto;
use crate::errors::OtpError;
use crate::models::OtpRecord;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_rate_limit_decision;
use crate::store::{otp_key, rate_limit_key, EphemeralStore, Replacement};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Upper bound on re-reads when a verification loses a swap race.
const MAX_SWAP_RETRIES: usize = 16;

/// OTP generation, verification and rate limiting.
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Create a fresh code for `phone_number`, replacing any previous one.
    ///
    /// Fails with `RateLimitExceeded` once the window quota is used up.
    async fn generate(&self, phone_number: &str) -> Result<String, OtpError>;

    /// Withdraw an undelivered `code` and give back its rate-limit slot.
    ///
    /// The record is removed only if it still holds `code`; a newer code
    /// generated in the meantime is left alone.
    async fn revoke(&self, phone_number: &str, code: &str) -> Result<(), OtpError>;

    /// Check `code` against the stored record, consuming it on success.
    async fn verify(&self, phone_number: &str, code: &str) -> Result<(), OtpError>;

    /// Whether the generation quota for the current window is used up.
    async fn is_rate_limited(&self, phone_number: &str) -> Result<bool, OtpError>;

    /// Read the current record without modifying it.
    async fn get_otp(&self, phone_number: &str) -> Result<OtpRecord, OtpError>;
}

/// [`OtpRepository`] backed by any [`EphemeralStore`].
pub struct StoreOtpRepository {
    store: Arc<dyn EphemeralStore>,
    clock: Arc<dyn Clock>,
}

impl StoreOtpRepository {
    pub fn new(store: Arc<dyn EphemeralStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Store TTL for a record expiring at `expires_at`, measured from `now`.
    fn store_ttl(
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<std::time::Duration, OtpError> {
        (expires_at + Duration::seconds(OTP_STORE_GRACE_SECONDS) - now)
            .to_std()
            .map_err(|e| OtpError::Internal(format!("Invalid OTP TTL: {}", e)))
    }

    fn decode(raw: &str) -> Result<OtpRecord, OtpError> {
        serde_json::from_str(raw).map_err(|e| {
            warn!(target: "otp.repo.otp", error = %e, "Stored OTP record is corrupt");
            OtpError::Storage(format!("Corrupt OTP record: {}", e))
        })
    }

    fn encode(record: &OtpRecord) -> Result<String, OtpError> {
        serde_json::to_string(record)
            .map_err(|e| OtpError::Internal(format!("Failed to encode OTP record: {}", e)))
    }

    /// Give back one generation slot. Failures are logged, not returned; the
    /// caller is already reporting the error that made the slot unused.
    async fn release_slot(&self, phone_number: &str, phone_hash: &str) {
        match self
            .store
            .decrement_above_zero(&rate_limit_key(phone_number))
            .await
        {
            Ok(remaining) => {
                record_rate_limit_decision("released");
                debug!(
                    target: "otp.repo.otp",
                    phone_hash = %phone_hash,
                    window_count = remaining.unwrap_or(0),
                    "Rate limit slot released"
                );
            }
            Err(e) => {
                warn!(
                    target: "otp.repo.otp",
                    phone_hash = %phone_hash,
                    error = %e,
                    "Failed to release rate limit slot"
                );
            }
        }
    }
}

fn window() -> std::time::Duration {
    std::time::Duration::from_secs(RATE_LIMIT_WINDOW_SECONDS.unsigned_abs())
}

#[async_trait]
impl OtpRepository for StoreOtpRepository {
    #[instrument(skip_all)]
    async fn generate(&self, phone_number: &str) -> Result<String, OtpError> {
        let phone_hash = hash_for_correlation(phone_number);
        let code = crypto::generate_otp_code()?;

        let now = self.clock.now();
        let record = OtpRecord {
            phone_number: phone_number.to_string(),
            code: code.clone(),
            expires_at: now + Duration::seconds(OTP_TTL_SECONDS),
            attempts: 0,
        };
        let encoded = Self::encode(&record)?;
        let ttl = Self::store_ttl(record.expires_at, now)?;

        // Reserve a slot in the window before anything is written
        let admitted = self
            .store
            .increment_below(
                &rate_limit_key(phone_number),
                RATE_LIMIT_MAX_REQUESTS,
                window(),
            )
            .await?;

        let Some(count) = admitted else {
            record_rate_limit_decision("rejected");
            debug!(target: "otp.repo.otp", phone_hash = %phone_hash, "OTP generation rate limited");
            return Err(OtpError::RateLimitExceeded);
        };
        record_rate_limit_decision("allowed");

        if let Err(e) = self.store.set(&otp_key(phone_number), &encoded, ttl).await {
            self.release_slot(phone_number, &phone_hash).await;
            return Err(e);
        }

        debug!(
            target: "otp.repo.otp",
            phone_hash = %phone_hash,
            window_count = count,
            "OTP generated"
        );
        Ok(code)
    }

    #[instrument(skip_all)]
    async fn revoke(&self, phone_number: &str, code: &str) -> Result<(), OtpError> {
        let phone_hash = hash_for_correlation(phone_number);
        let key = otp_key(phone_number);

        if let Some(raw) = self.store.get(&key).await? {
            let record = Self::decode(&raw)?;
            if record.code == code
                && self
                    .store
                    .compare_and_swap(&key, &raw, Replacement::Delete)
                    .await?
            {
                debug!(target: "otp.repo.otp", phone_hash = %phone_hash, "OTP revoked");
            }
        }

        self.release_slot(phone_number, &phone_hash).await;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn verify(&self, phone_number: &str, code: &str) -> Result<(), OtpError> {
        let phone_hash = hash_for_correlation(phone_number);
        let key = otp_key(phone_number);

        for _ in 0..MAX_SWAP_RETRIES {
            let raw = self.store.get(&key).await?.ok_or(OtpError::OtpNotFound)?;
            let record = Self::decode(&raw)?;
            let now = self.clock.now();

            if now >= record.expires_at {
                if self
                    .store
                    .compare_and_swap(&key, &raw, Replacement::Delete)
                    .await?
                {
                    debug!(target: "otp.repo.otp", phone_hash = %phone_hash, "OTP expired");
                    return Err(OtpError::OtpExpired);
                }
                continue;
            }

            if record.code == code {
                if self
                    .store
                    .compare_and_swap(&key, &raw, Replacement::Delete)
                    .await?
                {
                    debug!(target: "otp.repo.otp", phone_hash = %phone_hash, "OTP verified");
                    return Ok(());
                }
                continue;
            }

            let attempts = record.attempts.saturating_add(1);
            if attempts >= MAX_OTP_ATTEMPTS {
                if self
                    .store
                    .compare_and_swap(&key, &raw, Replacement::Delete)
                    .await?
                {
                    debug!(
                        target: "otp.repo.otp",
                        phone_hash = %phone_hash,
                        attempts,
                        "OTP discarded after too many attempts"
                    );
                    return Err(OtpError::TooManyAttempts);
                }
                continue;
            }

            // Keep the original expiry; a wrong guess does not buy more time
            let ttl = Self::store_ttl(record.expires_at, now)?;
            let updated = Self::encode(&OtpRecord { attempts, ..record })?;
            if self
                .store
                .compare_and_swap(
                    &key,
                    &raw,
                    Replacement::Value {
                        value: &updated,
                        ttl,
                    },
                )
                .await?
            {
                debug!(
                    target: "otp.repo.otp",
                    phone_hash = %phone_hash,
                    attempts,
                    "Invalid OTP attempt"
                );
                return Err(OtpError::InvalidOtp);
            }
        }

        warn!(
            target: "otp.repo.otp",
            phone_hash = %phone_hash,
            "OTP record kept changing during verification"
        );
        Err(OtpError::Storage(
            "OTP record changed concurrently".to_string(),
        ))
    }

    #[instrument(skip_all)]
    async fn is_rate_limited(&self, phone_number: &str) -> Result<bool, OtpError> {
        let count = match self.store.get(&rate_limit_key(phone_number)).await? {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|e| OtpError::Storage(format!("Corrupt rate counter: {}", e)))?,
            None => 0,
        };

        Ok(count >= RATE_LIMIT_MAX_REQUESTS)
    }

    #[instrument(skip_all)]
    async fn get_otp(&self, phone_number: &str) -> Result<OtpRecord, OtpError> {
        let raw = self
            .store
            .get(&otp_key(phone_number))
            .await?
            .ok_or(OtpError::OtpNotFound)?;
        let record = Self::decode(&raw)?;

        if self.clock.now() >= record.expires_at {
            return Err(OtpError::OtpExpired);
        }
        Ok(record)
    }
}
