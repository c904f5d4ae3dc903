//! Out-of-band OTP delivery.
//!
//! An SMS gateway would plug in here. The service ships with
//! [`LogOtpSender`] for development and [`CapturingOtpSender`] for tests.

use crate::errors::OtpError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

/// Delivers a freshly generated code to the phone number's owner.
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, phone_number: &str, code: &str) -> Result<(), OtpError>;
}

/// Development sink: writes the code to the log.
///
/// This is the only place a code or plaintext phone number is logged. Do not
/// enable it in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send(&self, phone_number: &str, code: &str) -> Result<(), OtpError> {
        info!(
            target: "otp.delivery",
            phone_number = %phone_number,
            code = %code,
            "OTP issued (development delivery)"
        );
        Ok(())
    }
}

/// Keeps the last code sent to each number so tests can complete a login.
#[derive(Debug, Default)]
pub struct CapturingOtpSender {
    sent: Mutex<HashMap<String, Vec<String>>>,
}

impl CapturingOtpSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent code sent to `phone_number`.
    pub async fn last_code(&self, phone_number: &str) -> Option<String> {
        self.sent
            .lock()
            .await
            .get(phone_number)
            .and_then(|codes| codes.last().cloned())
    }

    /// Number of codes sent to `phone_number`.
    pub async fn sent_count(&self, phone_number: &str) -> usize {
        self.sent
            .lock()
            .await
            .get(phone_number)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl OtpSender for CapturingOtpSender {
    async fn send(&self, phone_number: &str, code: &str) -> Result<(), OtpError> {
        self.sent
            .lock()
            .await
            .entry(phone_number.to_string())
            .or_default()
            .push(code.to_string());
        Ok(())
    }
}
