//! Create the test library: products, versions, environments, cases and suites.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Products::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductVersions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductVersions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductVersions::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductVersions::Version)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductVersions::Codename)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ProductVersions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ProductVersions::Table, ProductVersions::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Environments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Environments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Environments::Name)
                            .string_len(200)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Environments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cases::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cases::ProductId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Cases::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Cases::Table, Cases::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CaseVersions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CaseVersions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CaseVersions::CaseId).big_integer().not_null())
                    .col(
                        ColumnDef::new(CaseVersions::ProductVersionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CaseVersions::Name).string_len(200).not_null())
                    .col(
                        ColumnDef::new(CaseVersions::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(CaseVersions::Status)
                            .string_len(30)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(CaseVersions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CaseVersions::Table, CaseVersions::CaseId)
                            .to(Cases::Table, Cases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CaseVersions::Table, CaseVersions::ProductVersionId)
                            .to(ProductVersions::Table, ProductVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Activation resolves "the active version of this case for this product version"
        manager
            .create_index(
                Index::create()
                    .name("idx_case_versions_lookup")
                    .table(CaseVersions::Table)
                    .col(CaseVersions::CaseId)
                    .col(CaseVersions::ProductVersionId)
                    .col(CaseVersions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CaseVersionEnvironments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CaseVersionEnvironments::CaseVersionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CaseVersionEnvironments::EnvironmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(CaseVersionEnvironments::CaseVersionId)
                            .col(CaseVersionEnvironments::EnvironmentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                CaseVersionEnvironments::Table,
                                CaseVersionEnvironments::CaseVersionId,
                            )
                            .to(CaseVersions::Table, CaseVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                CaseVersionEnvironments::Table,
                                CaseVersionEnvironments::EnvironmentId,
                            )
                            .to(Environments::Table, Environments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CaseSteps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CaseSteps::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CaseSteps::CaseVersionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CaseSteps::Number).integer().not_null())
                    .col(ColumnDef::new(CaseSteps::Instruction).text().not_null())
                    .col(
                        ColumnDef::new(CaseSteps::Expected)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CaseSteps::Table, CaseSteps::CaseVersionId)
                            .to(CaseVersions::Table, CaseVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_case_steps_number")
                    .table(CaseSteps::Table)
                    .col(CaseSteps::CaseVersionId)
                    .col(CaseSteps::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Suites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Suites::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Suites::ProductId).big_integer().not_null())
                    .col(ColumnDef::new(Suites::Name).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Suites::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Suites::Status)
                            .string_len(30)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Suites::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Suites::Table, Suites::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SuiteCases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SuiteCases::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SuiteCases::SuiteId).big_integer().not_null())
                    .col(ColumnDef::new(SuiteCases::CaseId).big_integer().not_null())
                    .col(
                        ColumnDef::new(SuiteCases::Order)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SuiteCases::Table, SuiteCases::SuiteId)
                            .to(Suites::Table, Suites::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SuiteCases::Table, SuiteCases::CaseId)
                            .to(Cases::Table, Cases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_suite_cases_order")
                    .table(SuiteCases::Table)
                    .col(SuiteCases::SuiteId)
                    .col(SuiteCases::Order)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SuiteCases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Suites::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CaseSteps::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CaseVersionEnvironments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CaseVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Environments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Products {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum ProductVersions {
    Table,
    Id,
    ProductId,
    Version,
    Codename,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Environments {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Cases {
    Table,
    Id,
    ProductId,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum CaseVersions {
    Table,
    Id,
    CaseId,
    ProductVersionId,
    Name,
    Description,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CaseVersionEnvironments {
    Table,
    CaseVersionId,
    EnvironmentId,
}

#[derive(DeriveIden)]
pub enum CaseSteps {
    Table,
    Id,
    CaseVersionId,
    Number,
    Instruction,
    Expected,
}

#[derive(DeriveIden)]
pub enum Suites {
    Table,
    Id,
    ProductId,
    Name,
    Description,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SuiteCases {
    Table,
    Id,
    SuiteId,
    CaseId,
    Order,
}
