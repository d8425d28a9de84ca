//! Join table: environments a case version applies to.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "case_version_environments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub case_version_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub environment_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::case_version::Entity",
        from = "Column::CaseVersionId",
        to = "super::case_version::Column::Id",
        on_delete = "Cascade"
    )]
    CaseVersion,
    #[sea_orm(
        belongs_to = "super::environment::Entity",
        from = "Column::EnvironmentId",
        to = "super::environment::Column::Id",
        on_delete = "Cascade"
    )]
    Environment,
}

impl ActiveModelBehavior for ActiveModel {}
