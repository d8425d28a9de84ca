//! RunCaseVersion entity: a case version locked into a run at activation.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "run_case_versions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub run_id: i64,
    pub case_version_id: i64,
    pub order: i32,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::run::Entity",
        from = "Column::RunId",
        to = "super::run::Column::Id",
        on_delete = "Cascade"
    )]
    Run,
    #[sea_orm(
        belongs_to = "super::case_version::Entity",
        from = "Column::CaseVersionId",
        to = "super::case_version::Column::Id",
        on_delete = "Cascade"
    )]
    CaseVersion,
}

impl Related<super::run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Run.def()
    }
}

impl Related<super::case_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CaseVersion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
