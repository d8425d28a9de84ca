//! Create results and step_results tables.

use sea_orm_migration::prelude::*;

use super::m20261016_000001_create_users::Users;
use super::m20261016_000002_create_library::{CaseSteps, Environments};
use super::m20261016_000003_create_runs::RunCaseVersions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Results::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Results::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Results::TesterId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Results::RunCaseVersionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Results::EnvironmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Results::Status)
                            .string_len(50)
                            .not_null()
                            .default("assigned"),
                    )
                    .col(
                        ColumnDef::new(Results::Review)
                            .string_len(50)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Results::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Results::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Results::Comment)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Results::ReviewedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Results::ReviewedBy).big_integer())
                    .col(
                        ColumnDef::new(Results::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Results::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Results::Table, Results::TesterId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Results::Table, Results::RunCaseVersionId)
                            .to(RunCaseVersions::Table, RunCaseVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Results::Table, Results::EnvironmentId)
                            .to(Environments::Table, Environments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Results::Table, Results::ReviewedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // One result per tester per run case version per environment.
        // Concurrent "start" requests race on this index instead of creating duplicates.
        manager
            .create_index(
                Index::create()
                    .name("idx_results_tester_rcv_env")
                    .table(Results::Table)
                    .col(Results::RunCaseVersionId)
                    .col(Results::TesterId)
                    .col(Results::EnvironmentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_results_status")
                    .table(Results::Table)
                    .col(Results::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StepResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StepResults::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StepResults::ResultId).big_integer().not_null())
                    .col(ColumnDef::new(StepResults::StepId).big_integer().not_null())
                    .col(
                        ColumnDef::new(StepResults::Status)
                            .string_len(50)
                            .not_null()
                            .default("passed"),
                    )
                    .col(
                        ColumnDef::new(StepResults::BugUrl)
                            .string_len(200)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(StepResults::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StepResults::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(StepResults::Table, StepResults::ResultId)
                            .to(Results::Table, Results::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(StepResults::Table, StepResults::StepId)
                            .to(CaseSteps::Table, CaseSteps::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_step_results_result_step")
                    .table(StepResults::Table)
                    .col(StepResults::ResultId)
                    .col(StepResults::StepId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StepResults::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Results::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Results {
    Table,
    Id,
    TesterId,
    RunCaseVersionId,
    EnvironmentId,
    Status,
    Review,
    StartedAt,
    CompletedAt,
    Comment,
    ReviewedAt,
    ReviewedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StepResults {
    Table,
    Id,
    ResultId,
    StepId,
    Status,
    BugUrl,
    CreatedAt,
    UpdatedAt,
}
