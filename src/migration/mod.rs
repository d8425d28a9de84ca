//! SeaORM database migrations.
//!
//! Schemas are built with the sea-query table builder so the same migrations
//! run against PostgreSQL in production and SQLite in tests.

pub use sea_orm_migration::prelude::*;

mod m20261016_000001_create_users;
mod m20261016_000002_create_library;
mod m20261016_000003_create_runs;
mod m20261016_000004_create_results;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261016_000001_create_users::Migration),
            Box::new(m20261016_000002_create_library::Migration),
            Box::new(m20261016_000003_create_runs::Migration),
            Box::new(m20261016_000004_create_results::Migration),
        ]
    }
}
