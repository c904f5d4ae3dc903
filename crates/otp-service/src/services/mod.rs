//! Business logic layer.

pub mod auth_service;
pub mod otp_sender;
pub mod user_service;

pub use auth_service::AuthService;
pub use otp_sender::{CapturingOtpSender, LogOtpSender, OtpSender};
pub use user_service::UserService;
