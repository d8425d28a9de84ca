//! Case tracking server library.
//!
//! Test case libraries, test runs and result recording, exposed over an
//! Actix-web JSON API.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
