//! Create runs and the tables that tie runs to suites, case versions and environments.

use sea_orm_migration::prelude::*;

use super::m20261016_000002_create_library::{CaseVersions, Environments, ProductVersions, Suites};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Runs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Runs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Runs::ProductVersionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Runs::Name).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Runs::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Runs::Status)
                            .string_len(30)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Runs::StartDate).date().not_null())
                    .col(ColumnDef::new(Runs::EndDate).date())
                    .col(
                        ColumnDef::new(Runs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Runs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Runs::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Runs::Table, Runs::ProductVersionId)
                            .to(ProductVersions::Table, ProductVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_runs_status")
                    .table(Runs::Table)
                    .col(Runs::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RunEnvironments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RunEnvironments::RunId).big_integer().not_null())
                    .col(
                        ColumnDef::new(RunEnvironments::EnvironmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(RunEnvironments::RunId)
                            .col(RunEnvironments::EnvironmentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RunEnvironments::Table, RunEnvironments::RunId)
                            .to(Runs::Table, Runs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RunEnvironments::Table, RunEnvironments::EnvironmentId)
                            .to(Environments::Table, Environments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RunSuites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RunSuites::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RunSuites::RunId).big_integer().not_null())
                    .col(ColumnDef::new(RunSuites::SuiteId).big_integer().not_null())
                    .col(
                        ColumnDef::new(RunSuites::Order)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RunSuites::Table, RunSuites::RunId)
                            .to(Runs::Table, Runs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RunSuites::Table, RunSuites::SuiteId)
                            .to(Suites::Table, Suites::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_run_suites_order")
                    .table(RunSuites::Table)
                    .col(RunSuites::RunId)
                    .col(RunSuites::Order)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RunCaseVersions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RunCaseVersions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RunCaseVersions::RunId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RunCaseVersions::CaseVersionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RunCaseVersions::Order)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RunCaseVersions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RunCaseVersions::Table, RunCaseVersions::RunId)
                            .to(Runs::Table, Runs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RunCaseVersions::Table, RunCaseVersions::CaseVersionId)
                            .to(CaseVersions::Table, CaseVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_run_case_versions_order")
                    .table(RunCaseVersions::Table)
                    .col(RunCaseVersions::RunId)
                    .col(RunCaseVersions::Order)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RunCaseVersionEnvironments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RunCaseVersionEnvironments::RunCaseVersionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RunCaseVersionEnvironments::EnvironmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(RunCaseVersionEnvironments::RunCaseVersionId)
                            .col(RunCaseVersionEnvironments::EnvironmentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                RunCaseVersionEnvironments::Table,
                                RunCaseVersionEnvironments::RunCaseVersionId,
                            )
                            .to(RunCaseVersions::Table, RunCaseVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                RunCaseVersionEnvironments::Table,
                                RunCaseVersionEnvironments::EnvironmentId,
                            )
                            .to(Environments::Table, Environments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RunCaseVersionEnvironments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RunCaseVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RunSuites::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RunEnvironments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Runs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Runs {
    Table,
    Id,
    ProductVersionId,
    Name,
    Description,
    Status,
    StartDate,
    EndDate,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum RunEnvironments {
    Table,
    RunId,
    EnvironmentId,
}

#[derive(DeriveIden)]
enum RunSuites {
    Table,
    Id,
    RunId,
    SuiteId,
    Order,
}

#[derive(DeriveIden)]
pub enum RunCaseVersions {
    Table,
    Id,
    RunId,
    CaseVersionId,
    Order,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RunCaseVersionEnvironments {
    Table,
    RunCaseVersionId,
    EnvironmentId,
}
