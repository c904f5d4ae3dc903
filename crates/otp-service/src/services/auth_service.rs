//! Phone login flow: request an OTP, verify it, get a bearer token.
//!
//! # Verification steps
//!
//! 1. Verify the code (any failure is returned unchanged)
//! 2. Find the user by phone number; create one if absent, otherwise bump
//!    `last_login_at`
//! 3. Issue a token for the user
//! 4. Return token, user and whether the user is new

use crate::clock::Clock;
use crate::crypto::{TokenClaims, TokenIssuer};
use crate::errors::OtpError;
use crate::models::{RequestOtpResponse, User, VerifyOtpResponse};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{
    record_otp_generation, record_otp_verification, record_token_issuance,
};
use crate::repositories::{OtpRepository, UserRepository};
use crate::services::OtpSender;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

pub const OTP_SENT_MESSAGE: &str = "OTP sent successfully";
pub const AUTH_SUCCESS_MESSAGE: &str = "Authentication successful";

/// Orchestrates the OTP store, user directory and token issuer.
pub struct AuthService {
    otp_repo: Arc<dyn OtpRepository>,
    user_repo: Arc<dyn UserRepository>,
    token_issuer: TokenIssuer,
    sender: Arc<dyn OtpSender>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        otp_repo: Arc<dyn OtpRepository>,
        user_repo: Arc<dyn UserRepository>,
        token_issuer: TokenIssuer,
        sender: Arc<dyn OtpSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            otp_repo,
            user_repo,
            token_issuer,
            sender,
            clock,
        }
    }

    /// Generate a code for `phone_number` and hand it to the sender.
    #[instrument(skip_all)]
    pub async fn request_otp(&self, phone_number: &str) -> Result<RequestOtpResponse, OtpError> {
        let code = match self.otp_repo.generate(phone_number).await {
            Ok(code) => code,
            Err(e) => {
                record_otp_generation("error");
                return Err(e);
            }
        };

        if let Err(e) = self.sender.send(phone_number, &code).await {
            warn!(
                target: "otp.service.auth",
                phone_hash = %hash_for_correlation(phone_number),
                error = %e,
                "OTP delivery failed"
            );
            // An undelivered code must not count against the window
            if let Err(revoke_err) = self.otp_repo.revoke(phone_number, &code).await {
                warn!(
                    target: "otp.service.auth",
                    error = %revoke_err,
                    "Failed to revoke undelivered OTP"
                );
            }
            record_otp_generation("error");
            return Err(e);
        }

        record_otp_generation("success");
        Ok(RequestOtpResponse {
            message: OTP_SENT_MESSAGE.to_string(),
            phone_number: phone_number.to_string(),
        })
    }

    /// Verify a code and log the user in, registering them on first login.
    #[instrument(skip_all)]
    pub async fn verify_otp(
        &self,
        phone_number: &str,
        code: &str,
    ) -> Result<VerifyOtpResponse, OtpError> {
        if let Err(e) = self.otp_repo.verify(phone_number, code).await {
            record_otp_verification(e.code());
            return Err(e);
        }
        record_otp_verification("success");

        let (user, is_new_user) = self.login(phone_number).await?;

        let start = Instant::now();
        let token = match self.token_issuer.issue(user.id, &user.phone_number) {
            Ok(token) => {
                record_token_issuance("success", start.elapsed());
                token
            }
            Err(e) => {
                record_token_issuance("error", start.elapsed());
                return Err(e);
            }
        };

        info!(
            target: "otp.service.auth",
            user_id = %user.id,
            is_new_user,
            "User authenticated"
        );

        Ok(VerifyOtpResponse {
            message: AUTH_SUCCESS_MESSAGE.to_string(),
            token,
            user: user.into(),
            is_new_user,
        })
    }

    /// Validate a bearer token and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<TokenClaims, OtpError> {
        self.token_issuer.validate(token)
    }

    /// Find-or-create the user for a verified phone number.
    async fn login(&self, phone_number: &str) -> Result<(User, bool), OtpError> {
        let now = self.clock.now();

        match self.user_repo.get_by_phone_number(phone_number).await {
            Ok(user) => Ok((self.touch(user).await?, false)),
            Err(OtpError::UserNotFound) => {
                match self.user_repo.create(User::new(phone_number, now)).await {
                    Ok(user) => Ok((user, true)),
                    // Registered concurrently by another verification
                    Err(OtpError::UserAlreadyExists) => {
                        let user = self.user_repo.get_by_phone_number(phone_number).await?;
                        Ok((self.touch(user).await?, false))
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn touch(&self, mut user: User) -> Result<User, OtpError> {
        user.last_login_at = self.clock.now();
        self.user_repo.update(user).await
    }
}
