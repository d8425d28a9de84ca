//! Business logic services.

pub mod activation;
pub mod execution;
pub mod user_keys;

pub use activation::activate_run;
pub use execution::{ExecutionOutcome, apply_action, load_execution_rows};
