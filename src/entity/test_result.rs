//! Result entity: one tester's outcome for one run case version in one environment.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tester_id: i64,
    pub run_case_version_id: i64,
    pub environment_id: i64,
    pub status: String,
    pub review: String,
    pub started_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text")]
    pub comment: String,
    pub reviewed_at: Option<DateTimeUtc>,
    pub reviewed_by: Option<i64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::run_case_version::Entity",
        from = "Column::RunCaseVersionId",
        to = "super::run_case_version::Column::Id",
        on_delete = "Cascade"
    )]
    RunCaseVersion,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TesterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Tester,
    #[sea_orm(
        belongs_to = "super::environment::Entity",
        from = "Column::EnvironmentId",
        to = "super::environment::Column::Id",
        on_delete = "Cascade"
    )]
    Environment,
}

impl Related<super::run_case_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RunCaseVersion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
