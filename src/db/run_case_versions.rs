//! Database queries for run case versions.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};

use crate::entity::run_case_version::{self, Entity as RunCaseVersion};
use crate::entity::{case_version, run, run_case_version_environment};
use crate::error::{AppError, AppResult};
use crate::models::execution::{ListRunCaseVersionsQuery, RunCaseVersionSortField};
use crate::models::{EnvironmentSet, PaginationParams};

use super::{DbPool, name_contains};
use super::environments::load_run_case_version_environments;

/// Run case versions of a run in run order (ties by id).
pub(crate) async fn load_run_case_versions<C: ConnectionTrait>(
    db: &C,
    run_id: i64,
) -> Result<Vec<run_case_version::Model>, DbErr> {
    RunCaseVersion::find()
        .filter(run_case_version::Column::RunId.eq(run_id))
        .order_by_asc(run_case_version::Column::Order)
        .order_by_asc(run_case_version::Column::Id)
        .all(db)
        .await
}

pub(crate) async fn insert_run_case_version<C: ConnectionTrait>(
    db: &C,
    run_id: i64,
    case_version_id: i64,
    order: i32,
) -> Result<run_case_version::Model, DbErr> {
    run_case_version::ActiveModel {
        run_id: Set(run_id),
        case_version_id: Set(case_version_id),
        order: Set(order),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Remove every run case version of a run with its environment snapshots.
/// Returns the number of run case versions removed.
pub(crate) async fn delete_run_case_versions<C: ConnectionTrait>(
    db: &C,
    run_id: i64,
) -> Result<u64, DbErr> {
    let ids: Vec<i64> = RunCaseVersion::find()
        .filter(run_case_version::Column::RunId.eq(run_id))
        .select_only()
        .column(run_case_version::Column::Id)
        .into_tuple()
        .all(db)
        .await?;
    if ids.is_empty() {
        return Ok(0);
    }

    run_case_version_environment::Entity::delete_many()
        .filter(run_case_version_environment::Column::RunCaseVersionId.is_in(ids.clone()))
        .exec(db)
        .await?;
    let deleted = RunCaseVersion::delete_many()
        .filter(run_case_version::Column::Id.is_in(ids))
        .exec(db)
        .await?;
    Ok(deleted.rows_affected)
}

impl DbPool {
    pub async fn get_run_case_version(
        &self,
        id: i64,
    ) -> AppResult<Option<run_case_version::Model>> {
        RunCaseVersion::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get run case version: {}", e)))
    }

    /// Run case versions of a run in run order.
    pub async fn get_run_case_versions(
        &self,
        run_id: i64,
    ) -> AppResult<Vec<run_case_version::Model>> {
        load_run_case_versions(self.connection(), run_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get run case versions: {}", e)))
    }

    /// Environment snapshots keyed by run case version id.
    pub async fn get_run_case_version_environments(
        &self,
        ids: &[i64],
    ) -> AppResult<HashMap<i64, EnvironmentSet>> {
        load_run_case_version_environments(self.connection(), ids)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to get run case version environments: {}", e))
            })
    }

    /// List run case versions with filtering, sorting and pagination.
    pub async fn list_run_case_versions(
        &self,
        query: &ListRunCaseVersionsQuery,
    ) -> AppResult<(Vec<run_case_version::Model>, u64)> {
        let mut select = RunCaseVersion::find()
            .join(JoinType::InnerJoin, run_case_version::Relation::Run.def())
            .join(JoinType::InnerJoin, run_case_version::Relation::CaseVersion.def())
            .filter(run::Column::DeletedAt.is_null());

        if let Some(run_id) = query.run_id {
            select = select.filter(run_case_version::Column::RunId.eq(run_id));
        }
        if let Some(cv) = query.case_version_id {
            select = select.filter(run_case_version::Column::CaseVersionId.eq(cv));
        }
        if let Some(pv) = query.product_version_id {
            select = select.filter(run::Column::ProductVersionId.eq(pv));
        }
        if let Some(status) = query.run_status {
            select = select.filter(run::Column::Status.eq(status.as_str()));
        }
        if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            select = select.filter(name_contains(
                (case_version::Entity, case_version::Column::Name),
                name,
            ));
        }

        let total = select
            .clone()
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count run case versions: {}", e)))?;

        let order = query.sortdirection.unwrap_or_default();
        select = match query.sortfield.unwrap_or_default() {
            RunCaseVersionSortField::Order => {
                select.order_by(run_case_version::Column::Order, order.into())
            }
            RunCaseVersionSortField::Name => select.order_by(case_version::Column::Name, order.into()),
            RunCaseVersionSortField::CreatedAt => {
                select.order_by(run_case_version::Column::CreatedAt, order.into())
            }
            RunCaseVersionSortField::RunId => {
                select.order_by(run_case_version::Column::RunId, order.into())
            }
        };
        let params = PaginationParams::new(query.page, query.limit);

        let rows = select
            .order_by_asc(run_case_version::Column::Id)
            .offset(params.offset())
            .limit(params.clamped_limit() as u64)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list run case versions: {}", e)))?;

        Ok((rows, total))
    }
}
