//! Test execution suite.
//!
//! Exercises run activation, the result state machine and the HTTP surface
//! against an in-memory SQLite database.
//!
//! Run with: cargo test --test execution

mod helpers;

mod activation_tests;
mod execution_tests;
mod management_api_tests;
mod runtests_api_tests;
