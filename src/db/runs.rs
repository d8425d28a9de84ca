//! Database queries for runs, their suites and their environments.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::entity::run::{self, ActiveModel, Entity as Run};
use crate::entity::{product_version, run_case_version, run_case_version_environment, run_environment, run_suite, suite};
use crate::error::{AppError, AppResult};
use crate::models::run::{
    CreateRunRequest, ListRunsQuery, RunSortField, UpdateRunRequest, validate_run_fields,
};
use crate::models::{EnvironmentSet, PaginationParams, RunStatus, RunWithEnvironments};

use super::{DbPool, name_contains};
use super::environments::{
    insert_run_case_version_environments, insert_run_environments,
    load_run_case_version_environments, load_run_environments,
};
use super::run_case_versions::{insert_run_case_version, load_run_case_versions};

/// Prefix given to the name of a cloned run.
pub const CLONE_NAME_PREFIX: &str = "Cloned: ";

/// Suites of a run in inclusion order (ties by id).
pub(crate) async fn load_run_suites<C: ConnectionTrait>(
    db: &C,
    run_id: i64,
) -> Result<Vec<run_suite::Model>, DbErr> {
    run_suite::Entity::find()
        .filter(run_suite::Column::RunId.eq(run_id))
        .order_by_asc(run_suite::Column::Order)
        .order_by_asc(run_suite::Column::Id)
        .all(db)
        .await
}

/// A live (not deleted) run.
pub(crate) async fn load_run<C: ConnectionTrait>(
    db: &C,
    run_id: i64,
) -> Result<Option<run::Model>, DbErr> {
    Run::find_by_id(run_id)
        .filter(run::Column::DeletedAt.is_null())
        .one(db)
        .await
}

async fn insert_run_suites<C: ConnectionTrait>(
    db: &C,
    run_id: i64,
    suite_ids: &[i64],
) -> Result<(), DbErr> {
    for (index, suite_id) in suite_ids.iter().enumerate() {
        run_suite::ActiveModel {
            run_id: Set(run_id),
            suite_id: Set(*suite_id),
            order: Set(index as i32 + 1),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Write a run's status.
pub(crate) async fn write_run_status<C: ConnectionTrait>(
    db: &C,
    run: run::Model,
    status: RunStatus,
) -> Result<run::Model, DbErr> {
    let mut active: ActiveModel = run.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now());
    active.update(db).await
}

impl DbPool {
    /// Create a draft run with its environments and suites.
    pub async fn insert_run(&self, request: &CreateRunRequest) -> AppResult<RunWithEnvironments> {
        let start_date = request
            .start_date
            .unwrap_or_else(|| Utc::now().date_naive());
        validate_run_fields(&request.name, start_date, request.end_date)
            .map_err(AppError::Validation)?;

        let pv = self
            .get_product_version(request.product_version_id)
            .await?
            .ok_or_else(|| {
                AppError::field(
                    "product_version_id",
                    format!(
                        "Product version {} does not exist.",
                        request.product_version_id
                    ),
                )
            })?;
        let environments = self
            .resolve_environment_ids("environment_ids", &request.environment_ids)
            .await?;
        self.check_suites_for_product(&request.suite_ids, pv.product_id)
            .await?;

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let now = Utc::now();
        let run = ActiveModel {
            product_version_id: Set(pv.id),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description.clone()),
            status: Set(RunStatus::Draft.as_str().to_string()),
            start_date: Set(start_date),
            end_date: Set(request.end_date),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert run: {}", e)))?;

        insert_run_environments(&txn, run.id, &environments)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert run environments: {}", e)))?;
        insert_run_suites(&txn, run.id, &request.suite_ids)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert run suites: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit run: {}", e)))?;

        Ok(RunWithEnvironments { run, environments })
    }

    async fn check_suites_for_product(&self, suite_ids: &[i64], product_id: i64) -> AppResult<()> {
        if suite_ids.is_empty() {
            return Ok(());
        }
        let suites = suite::Entity::find()
            .filter(suite::Column::Id.is_in(suite_ids.to_vec()))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get suites: {}", e)))?;

        for suite_id in suite_ids {
            match suites.iter().find(|s| s.id == *suite_id) {
                None => {
                    return Err(AppError::field(
                        "suite_ids",
                        format!("Suite {} does not exist.", suite_id),
                    ));
                }
                Some(s) if s.product_id != product_id => {
                    return Err(AppError::field(
                        "suite_ids",
                        format!("Suite {} belongs to a different product.", suite_id),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Get a run by ID. Deleted runs are not returned.
    pub async fn get_run_by_id(&self, id: i64) -> AppResult<Option<run::Model>> {
        load_run(self.connection(), id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get run: {}", e)))
    }

    /// Get a run with its environment set.
    pub async fn get_run_with_environments(&self, id: i64) -> AppResult<Option<RunWithEnvironments>> {
        let Some(run) = self.get_run_by_id(id).await? else {
            return Ok(None);
        };
        let environments = self.get_run_environments(id).await?;
        Ok(Some(RunWithEnvironments { run, environments }))
    }

    /// Get a run or fail with `NotFound`.
    pub async fn require_run(&self, id: i64) -> AppResult<run::Model> {
        self.get_run_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Run {}", id)))
    }

    pub async fn get_run_suites(&self, run_id: i64) -> AppResult<Vec<run_suite::Model>> {
        load_run_suites(self.connection(), run_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get run suites: {}", e)))
    }

    pub async fn count_run_case_versions(&self, run_id: i64) -> AppResult<u64> {
        run_case_version::Entity::find()
            .filter(run_case_version::Column::RunId.eq(run_id))
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count run case versions: {}", e)))
    }

    /// List runs with optional filtering.
    pub async fn list_runs(&self, query: &ListRunsQuery) -> AppResult<(Vec<run::Model>, u64)> {
        let mut select = Run::find().filter(run::Column::DeletedAt.is_null());

        if let Some(status) = query.status {
            select = select.filter(run::Column::Status.eq(status.as_str()));
        }
        if let Some(pv) = query.product_version_id {
            select = select.filter(run::Column::ProductVersionId.eq(pv));
        }
        if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            select = select.filter(name_contains((Run, run::Column::Name), name));
        }

        let total = select
            .clone()
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count runs: {}", e)))?;

        let column = match query.sortfield.unwrap_or_default() {
            RunSortField::Name => run::Column::Name,
            RunSortField::StartDate => run::Column::StartDate,
            RunSortField::CreatedAt => run::Column::CreatedAt,
            RunSortField::Status => run::Column::Status,
        };
        let order = query.sortdirection.unwrap_or_default();
        let params = PaginationParams::new(query.page, query.limit);

        let runs = select
            .order_by(column, order.into())
            .order_by_asc(run::Column::Id)
            .offset(params.offset())
            .limit(params.clamped_limit() as u64)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list runs: {}", e)))?;

        Ok((runs, total))
    }

    /// Active runs open for testing, by name.
    pub async fn list_active_runs(
        &self,
        product_id: Option<i64>,
        product_version_id: Option<i64>,
        params: &PaginationParams,
    ) -> AppResult<(Vec<run::Model>, u64)> {
        let mut select = Run::find()
            .filter(run::Column::DeletedAt.is_null())
            .filter(run::Column::Status.eq(RunStatus::Active.as_str()));

        if let Some(pv) = product_version_id {
            select = select.filter(run::Column::ProductVersionId.eq(pv));
        }
        if let Some(product_id) = product_id {
            select = select
                .inner_join(product_version::Entity)
                .filter(product_version::Column::ProductId.eq(product_id));
        }

        let total = select
            .clone()
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count runs: {}", e)))?;

        let runs = select
            .order_by_asc(run::Column::Name)
            .order_by_asc(run::Column::Id)
            .offset(params.offset())
            .limit(params.clamped_limit() as u64)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list runs: {}", e)))?;

        Ok((runs, total))
    }

    /// Edit a run's fields. Dates are validated against the merged values.
    pub async fn update_run(&self, id: i64, request: &UpdateRunRequest) -> AppResult<run::Model> {
        let run = self.require_run(id).await?;

        let name = request.name.clone().unwrap_or_else(|| run.name.clone());
        let start_date = request.start_date.unwrap_or(run.start_date);
        let end_date = request.end_date.unwrap_or(run.end_date);
        validate_run_fields(&name, start_date, end_date).map_err(AppError::Validation)?;

        let mut active: ActiveModel = run.into();
        active.name = Set(name.trim().to_string());
        if let Some(description) = &request.description {
            active.description = Set(description.clone());
        }
        active.start_date = Set(start_date);
        active.end_date = Set(end_date);
        active.updated_at = Set(Utc::now());

        active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update run: {}", e)))
    }

    /// Soft-delete a run.
    pub async fn delete_run(&self, id: i64) -> AppResult<()> {
        let run = self.require_run(id).await?;

        let mut active: ActiveModel = run.into();
        let now = Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete run: {}", e)))?;

        Ok(())
    }

    /// Set a run's status without any other effect.
    pub async fn update_run_status(&self, id: i64, status: RunStatus) -> AppResult<run::Model> {
        let run = self.require_run(id).await?;
        write_run_status(self.connection(), run, status)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update run status: {}", e)))
    }

    /// Replace a draft run's suites. Suites of an active or disabled run are
    /// already expanded and cannot change.
    pub async fn replace_run_suites(
        &self,
        id: i64,
        suite_ids: &[i64],
    ) -> AppResult<Vec<run_suite::Model>> {
        let run = self.require_run(id).await?;
        if RunStatus::parse(&run.status) != Some(RunStatus::Draft) {
            return Err(AppError::Conflict(format!(
                "Run {} is {}; suites can only be changed on a draft run",
                id, run.status
            )));
        }
        let pv = self
            .get_product_version(run.product_version_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product version {}", run.product_version_id)))?;
        self.check_suites_for_product(suite_ids, pv.product_id)
            .await?;

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        run_suite::Entity::delete_many()
            .filter(run_suite::Column::RunId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to remove run suites: {}", e)))?;
        insert_run_suites(&txn, id, suite_ids)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert run suites: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit run suites: {}", e)))?;

        self.get_run_suites(id).await
    }

    /// Replace a run's environment set.
    ///
    /// Environments removed from the run are also removed from the snapshots
    /// of its run case versions. Added environments are not propagated.
    pub async fn replace_run_environments(
        &self,
        id: i64,
        environment_ids: &[i64],
    ) -> AppResult<RunWithEnvironments> {
        let run = self.require_run(id).await?;
        let environments = self
            .resolve_environment_ids("environment_ids", environment_ids)
            .await?;

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let previous = load_run_environments(&txn, id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get run environments: {}", e)))?;
        let removed = previous.difference(&environments);

        run_environment::Entity::delete_many()
            .filter(run_environment::Column::RunId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to remove run environments: {}", e)))?;
        insert_run_environments(&txn, id, &environments)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert run environments: {}", e)))?;

        if !removed.is_empty() {
            let rcv_ids: Vec<i64> = load_run_case_versions(&txn, id)
                .await
                .map_err(|e| AppError::Database(format!("Failed to get run case versions: {}", e)))?
                .into_iter()
                .map(|rcv| rcv.id)
                .collect();
            if !rcv_ids.is_empty() {
                let result = run_case_version_environment::Entity::delete_many()
                    .filter(run_case_version_environment::Column::RunCaseVersionId.is_in(rcv_ids))
                    .filter(run_case_version_environment::Column::EnvironmentId.is_in(removed.to_vec()))
                    .exec(&txn)
                    .await
                    .map_err(|e| {
                        AppError::Database(format!("Failed to update case version environments: {}", e))
                    })?;
                tracing::info!(
                    run_id = id,
                    removed = ?removed.to_vec(),
                    rows = result.rows_affected,
                    "Removed environments from run case versions"
                );
            }
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit run environments: {}", e)))?;

        Ok(RunWithEnvironments { run, environments })
    }

    /// Copy a run into a new draft run.
    ///
    /// Environments, suites and run case versions are copied in order, with
    /// the environment snapshots copied as they are.
    pub async fn clone_run(&self, id: i64) -> AppResult<RunWithEnvironments> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let source = load_run(&txn, id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get run: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Run {}", id)))?;

        let now = Utc::now();
        let cloned = ActiveModel {
            product_version_id: Set(source.product_version_id),
            name: Set(format!("{}{}", CLONE_NAME_PREFIX, source.name)),
            description: Set(source.description.clone()),
            status: Set(RunStatus::Draft.as_str().to_string()),
            start_date: Set(source.start_date),
            end_date: Set(source.end_date),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert cloned run: {}", e)))?;

        let copy = async {
            let environments = load_run_environments(&txn, id).await?;
            insert_run_environments(&txn, cloned.id, &environments).await?;

            let suite_ids: Vec<i64> = load_run_suites(&txn, id)
                .await?
                .into_iter()
                .map(|rs| rs.suite_id)
                .collect();
            insert_run_suites(&txn, cloned.id, &suite_ids).await?;

            let rcvs = load_run_case_versions(&txn, id).await?;
            let rcv_ids: Vec<i64> = rcvs.iter().map(|r| r.id).collect();
            let mut snapshots = load_run_case_version_environments(&txn, &rcv_ids).await?;
            for rcv in &rcvs {
                let snapshot = snapshots.remove(&rcv.id).unwrap_or_default();
                let copied =
                    insert_run_case_version(&txn, cloned.id, rcv.case_version_id, rcv.order)
                        .await?;
                insert_run_case_version_environments(&txn, copied.id, &snapshot).await?;
            }

            Ok::<_, DbErr>((environments, rcvs.len()))
        };
        let (environments, copied): (EnvironmentSet, usize) = copy
            .await
            .map_err(|e| AppError::Database(format!("Failed to copy run contents: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit cloned run: {}", e)))?;

        tracing::info!(
            run_id = id,
            clone_id = cloned.id,
            case_versions = copied,
            "Cloned run"
        );

        Ok(RunWithEnvironments {
            run: cloned,
            environments,
        })
    }
}
