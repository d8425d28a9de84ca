//! CaseStep entity. Steps are numbered from 1 within a case version.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "case_steps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub case_version_id: i64,
    pub number: i32,
    pub instruction: String,
    pub expected: String,
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
}

impl Related<super::case_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CaseVersion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
