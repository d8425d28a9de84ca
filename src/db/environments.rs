//! Database queries for environments and the environment sets attached to
//! runs, case versions and run case versions.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::entity::environment::{self, Entity as Environment};
use crate::entity::{case_version_environment, run_case_version_environment, run_environment};
use crate::error::{AppError, AppResult};
use crate::models::EnvironmentSet;

use super::{DbPool, is_unique_violation};

/// Environment set of a run.
pub(crate) async fn load_run_environments<C: ConnectionTrait>(
    db: &C,
    run_id: i64,
) -> Result<EnvironmentSet, DbErr> {
    let rows = run_environment::Entity::find()
        .filter(run_environment::Column::RunId.eq(run_id))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| r.environment_id).collect())
}

/// Environment sets of several case versions, keyed by case version id.
/// Case versions without environments map to an empty set.
pub(crate) async fn load_case_version_environments<C: ConnectionTrait>(
    db: &C,
    case_version_ids: &[i64],
) -> Result<HashMap<i64, EnvironmentSet>, DbErr> {
    let mut sets: HashMap<i64, EnvironmentSet> = case_version_ids
        .iter()
        .map(|id| (*id, EnvironmentSet::default()))
        .collect();
    if case_version_ids.is_empty() {
        return Ok(sets);
    }

    let rows = case_version_environment::Entity::find()
        .filter(case_version_environment::Column::CaseVersionId.is_in(case_version_ids.to_vec()))
        .all(db)
        .await?;
    for row in rows {
        sets.entry(row.case_version_id)
            .or_default()
            .insert(row.environment_id);
    }
    Ok(sets)
}

/// Environment snapshots of several run case versions, keyed by id.
pub(crate) async fn load_run_case_version_environments<C: ConnectionTrait>(
    db: &C,
    run_case_version_ids: &[i64],
) -> Result<HashMap<i64, EnvironmentSet>, DbErr> {
    let mut sets: HashMap<i64, EnvironmentSet> = run_case_version_ids
        .iter()
        .map(|id| (*id, EnvironmentSet::default()))
        .collect();
    if run_case_version_ids.is_empty() {
        return Ok(sets);
    }

    let rows = run_case_version_environment::Entity::find()
        .filter(
            run_case_version_environment::Column::RunCaseVersionId
                .is_in(run_case_version_ids.to_vec()),
        )
        .all(db)
        .await?;
    for row in rows {
        sets.entry(row.run_case_version_id)
            .or_default()
            .insert(row.environment_id);
    }
    Ok(sets)
}

/// Attach `environments` to a run.
pub(crate) async fn insert_run_environments<C: ConnectionTrait>(
    db: &C,
    run_id: i64,
    environments: &EnvironmentSet,
) -> Result<(), DbErr> {
    if environments.is_empty() {
        return Ok(());
    }
    let rows = environments.iter().map(|env_id| run_environment::ActiveModel {
        run_id: Set(run_id),
        environment_id: Set(env_id),
    });
    run_environment::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Store the environment snapshot of a run case version.
pub(crate) async fn insert_run_case_version_environments<C: ConnectionTrait>(
    db: &C,
    run_case_version_id: i64,
    environments: &EnvironmentSet,
) -> Result<(), DbErr> {
    if environments.is_empty() {
        return Ok(());
    }
    let rows = environments
        .iter()
        .map(|env_id| run_case_version_environment::ActiveModel {
            run_case_version_id: Set(run_case_version_id),
            environment_id: Set(env_id),
        });
    run_case_version_environment::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Attach `environments` to a case version.
pub(crate) async fn insert_case_version_environments<C: ConnectionTrait>(
    db: &C,
    case_version_id: i64,
    environments: &EnvironmentSet,
) -> Result<(), DbErr> {
    if environments.is_empty() {
        return Ok(());
    }
    let rows = environments
        .iter()
        .map(|env_id| case_version_environment::ActiveModel {
            case_version_id: Set(case_version_id),
            environment_id: Set(env_id),
        });
    case_version_environment::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

impl DbPool {
    /// Insert a new environment.
    pub async fn insert_environment(&self, name: &str) -> AppResult<environment::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::field("name", "This field is required."));
        }

        let model = environment::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        model.insert(self.connection()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::field("name", format!("Environment '{}' already exists.", name))
            } else {
                AppError::Database(format!("Failed to insert environment: {}", e))
            }
        })
    }

    /// List all environments by name.
    pub async fn list_environments(&self) -> AppResult<Vec<environment::Model>> {
        Environment::find()
            .order_by_asc(environment::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list environments: {}", e)))
    }

    /// Get a single environment.
    pub async fn get_environment(&self, id: i64) -> AppResult<Option<environment::Model>> {
        Environment::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get environment: {}", e)))
    }

    /// Environments in `set`, ordered by name.
    pub async fn get_environments_in(
        &self,
        set: &EnvironmentSet,
    ) -> AppResult<Vec<environment::Model>> {
        if set.is_empty() {
            return Ok(Vec::new());
        }
        Environment::find()
            .filter(environment::Column::Id.is_in(set.to_vec()))
            .order_by_asc(environment::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get environments: {}", e)))
    }

    /// Check that every id names an existing environment and return them as a set.
    pub async fn resolve_environment_ids(
        &self,
        field: &str,
        ids: &[i64],
    ) -> AppResult<EnvironmentSet> {
        let requested: EnvironmentSet = ids.iter().copied().collect();
        let found: EnvironmentSet = self
            .get_environments_in(&requested)
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();

        if let Some(missing) = requested.difference(&found).iter().next() {
            return Err(AppError::field(
                field,
                format!("Environment {} does not exist.", missing),
            ));
        }
        Ok(requested)
    }

    /// Environment set of a run.
    pub async fn get_run_environments(&self, run_id: i64) -> AppResult<EnvironmentSet> {
        load_run_environments(self.connection(), run_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get run environments: {}", e)))
    }
}
