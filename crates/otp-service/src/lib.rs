//! OTP Auth Service Library
//!
//! Phone number login with one-time passcodes: a caller requests a code,
//! proves possession of the phone by verifying it, and receives a bearer
//! token. First login registers the user.
//!
//! # Modules
//!
//! - `clock` - Time source (wall clock or manually advanced for tests)
//! - `config` - Service configuration and policy constants
//! - `crypto` - Code generation and bearer token signing
//! - `errors` - Error types and their HTTP mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer auth and HTTP metrics layers
//! - `models` - Data models and wire types
//! - `observability` - Metrics and log correlation helpers
//! - `repositories` - OTP store and user directory
//! - `routes` - Router and shared state
//! - `services` - Business logic layer
//! - `store` - Ephemeral key/value store (Redis or in-process)
//! - `validation` - Request input validation

pub mod clock;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod store;
pub mod validation;
