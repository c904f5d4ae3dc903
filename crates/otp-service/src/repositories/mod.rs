//! Data access for OTP records and users.

pub mod otp;
pub mod users;

pub use otp::{OtpRepository, StoreOtpRepository};
pub use users::{InMemoryUserRepository, UserPage, UserRepository};
