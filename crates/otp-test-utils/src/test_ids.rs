//! Fixed test data for deterministic tests
//!
//! Phone numbers are in the 555-01xx fictional range.

use uuid::Uuid;

// Phone numbers (E.164)
pub const TEST_PHONE_ALICE: &str = "+14155550100";
pub const TEST_PHONE_BOB: &str = "+14155550101";
pub const TEST_PHONE_CHARLIE: &str = "+14155550102";

// User IDs (100-199), for tokens minted without a login
pub const TEST_USER_ALICE: Uuid = Uuid::from_u128(100);
pub const TEST_USER_BOB: Uuid = Uuid::from_u128(101);

// HS256 secret the test server signs with (exactly 32 bytes)
pub const TEST_JWT_SECRET: &str = "test-secret-do-not-use-in-prod!!";

// A different secret of valid length, for signature mismatch tests
pub const TEST_WRONG_JWT_SECRET: &str = "another-secret-not-the-server-s!";
