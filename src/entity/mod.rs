//! SeaORM entity definitions.
//!
//! Library tables (products through suite membership) describe what can be
//! tested; execution tables (runs through step results) record what was.

pub mod case;
pub mod case_step;
pub mod case_version;
pub mod case_version_environment;
pub mod environment;
pub mod product;
pub mod product_version;
pub mod run;
pub mod run_case_version;
pub mod run_case_version_environment;
pub mod run_environment;
pub mod run_suite;
pub mod step_result;
pub mod suite;
pub mod suite_case;
pub mod test_result;
pub mod user;
