//! # OTP Test Utilities
//!
//! Shared test utilities for the OTP auth service.
//!
//! This crate provides:
//! - Fixed test data (phone numbers, user IDs, the test signing secret)
//! - Test data builders (`TestTokenBuilder`)
//! - Server test harness (`TestOtpServer` for E2E tests)
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use otp_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestOtpServer::spawn().await?;
//!     let login = server.login(TEST_PHONE_ALICE).await?;
//!
//!     login.token
//!         .assert_valid_jwt()
//!         .assert_for_phone(TEST_PHONE_ALICE);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
