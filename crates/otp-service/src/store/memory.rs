//! In-process ephemeral store.
//!
//! A TTL-aware map guarded by a single async mutex. Every trait operation
//! holds the lock for its whole duration, which makes the compound
//! operations atomic with respect to each other. Expired entries are dropped
//! lazily when touched.
//!
//! Suitable for tests and single-instance development; state is lost on
//! restart and is not shared between processes.

use super::{EphemeralStore, Replacement};
use crate::clock::Clock;
use crate::errors::OtpError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn deadline(&self, ttl: Duration) -> Result<DateTime<Utc>, OtpError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| OtpError::Storage(format!("TTL out of range: {e}")))?;
        Ok(self.clock.now() + ttl)
    }

    /// Number of live keys (expired entries excluded).
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Drop `key` if it has expired, then return whatever is left.
fn live<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: DateTime<Utc>,
) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|e| e.is_expired(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

fn parse_counter(entry: Option<&Entry>) -> Result<i64, OtpError> {
    match entry {
        Some(e) => e
            .value
            .parse()
            .map_err(|_| OtpError::Storage("value is not an integer".to_string())),
        None => Ok(0),
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), OtpError> {
        let expires_at = self.deadline(ttl)?;
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, OtpError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key, now).map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), OtpError> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64, OtpError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let count = parse_counter(live(&mut entries, key, now).as_deref())? + 1;

        entries
            .entry(key.to_string())
            .and_modify(|e| e.value = count.to_string())
            .or_insert_with(|| Entry {
                value: count.to_string(),
                expires_at: None,
            });
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), OtpError> {
        let expires_at = self.deadline(ttl)?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        if let Some(entry) = live(&mut entries, key, now) {
            entry.expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn increment_below(
        &self,
        key: &str,
        limit: i64,
        ttl: Duration,
    ) -> Result<Option<i64>, OtpError> {
        let expires_at = self.deadline(ttl)?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let current = parse_counter(live(&mut entries, key, now).as_deref())?;

        if current >= limit {
            return Ok(None);
        }

        let count = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at: Some(expires_at),
            },
        );
        Ok(Some(count))
    }

    async fn decrement_above_zero(&self, key: &str) -> Result<Option<i64>, OtpError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let Some(entry) = live(&mut entries, key, now) else {
            return Ok(None);
        };

        let current = parse_counter(Some(entry))?;
        if current <= 0 {
            return Ok(None);
        }

        let count = current - 1;
        entry.value = count.to_string();
        Ok(Some(count))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        replacement: Replacement<'_>,
    ) -> Result<bool, OtpError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let matches = live(&mut entries, key, now).is_some_and(|e| e.value == expected);
        if !matches {
            return Ok(false);
        }

        match replacement {
            Replacement::Delete => {
                entries.remove(key);
            }
            Replacement::Value { value, ttl } => {
                let expires_at = self.deadline(ttl)?;
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: value.to_string(),
                        expires_at: Some(expires_at),
                    },
                );
            }
        }
        Ok(true)
    }
}
