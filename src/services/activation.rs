//! Run activation: locking a draft run's case versions.
//!
//! Activating a draft run walks its suites in order, resolves each suite
//! case to the case's active version for the run's product version, and
//! creates one run case version per resolved case that shares at least one
//! environment with the run. Each created row gets the next order number and
//! a snapshot of the shared environments.

use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, TransactionTrait};

use crate::db::DbPool;
use crate::db::environments::{
    insert_run_case_version_environments, load_case_version_environments, load_run_environments,
};
use crate::db::library::{load_active_case_versions, load_suite_cases};
use crate::db::run_case_versions::{delete_run_case_versions, insert_run_case_version};
use crate::db::runs::{load_run, load_run_suites, write_run_status};
use crate::entity::run;
use crate::error::{AppError, AppResult};
use crate::models::{
    CaseVersionWithEnvironments, EnvironmentSet, HasEnvironments, RunStatus, RunWithEnvironments,
};

/// A run case version to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCaseVersion {
    pub case_version_id: i64,
    pub order: i32,
    pub environments: EnvironmentSet,
}

/// Decide which case versions a run locks in.
///
/// `suites` holds the case ids of each of the run's suites, both in order.
/// `active_versions` maps a case id to its active versions for the run's
/// product version, lowest id first. A case listed in several suites is
/// planned once per listing.
pub fn plan_locked_case_versions(
    run: &impl HasEnvironments,
    suites: &[Vec<i64>],
    active_versions: &HashMap<i64, Vec<CaseVersionWithEnvironments>>,
) -> Vec<PlannedCaseVersion> {
    let mut planned = Vec::new();
    let mut order = 1;

    for case_id in suites.iter().flatten() {
        let Some(versions) = active_versions.get(case_id) else {
            continue;
        };
        let Some(chosen) = versions.first() else {
            continue;
        };
        if versions.len() > 1 {
            tracing::warn!(
                case_id,
                case_version_id = chosen.case_version.id,
                candidates = versions.len(),
                "Case has several active versions, using the oldest"
            );
        }

        let shared = run.shared_environments(chosen);
        if shared.is_empty() {
            continue;
        }
        planned.push(PlannedCaseVersion {
            case_version_id: chosen.case_version.id,
            order,
            environments: shared,
        });
        order += 1;
    }

    planned
}

/// Activate a run.
///
/// A draft run has its case versions locked in first, replacing any it
/// already holds (a clone carries copies of its source's). Any other run
/// only has its status set to active.
pub async fn activate_run(pool: &DbPool, run_id: i64) -> AppResult<run::Model> {
    let txn = pool
        .connection()
        .begin()
        .await
        .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

    let run = load_run(&txn, run_id)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get run: {}", e)))?
        .ok_or_else(|| AppError::NotFound(format!("Run {}", run_id)))?;
    let was_draft = RunStatus::parse(&run.status) == Some(RunStatus::Draft);

    let locked = if was_draft {
        lock_case_versions(&txn, &run).await?
    } else {
        0
    };

    let run = write_run_status(&txn, run, RunStatus::Active)
        .await
        .map_err(|e| AppError::Database(format!("Failed to update run status: {}", e)))?;

    txn.commit()
        .await
        .map_err(|e| AppError::Database(format!("Failed to commit activation: {}", e)))?;

    tracing::info!(
        run_id,
        was_draft,
        case_versions = locked,
        "Activated run"
    );
    Ok(run)
}

async fn lock_case_versions(txn: &DatabaseTransaction, run: &run::Model) -> AppResult<usize> {
    let db_err = |e: sea_orm::DbErr| AppError::Database(format!("Failed to lock case versions: {}", e));

    let replaced = delete_run_case_versions(txn, run.id).await.map_err(db_err)?;
    if replaced > 0 {
        tracing::info!(run_id = run.id, replaced, "Replacing copied run case versions");
    }

    let environments = load_run_environments(txn, run.id).await.map_err(db_err)?;
    let run_with_envs = RunWithEnvironments {
        run: run.clone(),
        environments,
    };

    let mut suites = Vec::new();
    for run_suite in load_run_suites(txn, run.id).await.map_err(db_err)? {
        let case_ids: Vec<i64> = load_suite_cases(txn, run_suite.suite_id)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|sc| sc.case_id)
            .collect();
        suites.push(case_ids);
    }

    let mut case_ids: Vec<i64> = suites.iter().flatten().copied().collect();
    case_ids.sort_unstable();
    case_ids.dedup();

    let versions = load_active_case_versions(txn, &case_ids, run.product_version_id)
        .await
        .map_err(db_err)?;
    let version_ids: Vec<i64> = versions.iter().map(|cv| cv.id).collect();
    let mut env_sets = load_case_version_environments(txn, &version_ids)
        .await
        .map_err(db_err)?;

    let mut active_versions: HashMap<i64, Vec<CaseVersionWithEnvironments>> = HashMap::new();
    for cv in versions {
        active_versions
            .entry(cv.case_id)
            .or_default()
            .push(CaseVersionWithEnvironments {
                environments: env_sets.remove(&cv.id).unwrap_or_default(),
                case_version: cv,
            });
    }

    let planned = plan_locked_case_versions(&run_with_envs, &suites, &active_versions);
    for item in &planned {
        let rcv = insert_run_case_version(txn, run.id, item.case_version_id, item.order)
            .await
            .map_err(db_err)?;
        insert_run_case_version_environments(txn, rcv.id, &item.environments)
            .await
            .map_err(db_err)?;
    }

    Ok(planned.len())
}
