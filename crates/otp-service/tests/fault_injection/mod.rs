//! Fault injection test modules

mod store_failure_tests;
