//! Test execution: applying tester actions to results and assembling the
//! rows of the execution screen.

use std::collections::HashMap;

use chrono::Utc;

use crate::db::DbPool;
use crate::entity::run_case_version;
use crate::error::AppResult;
use crate::models::execution::{ExecutionRow, RunCaseVersionResponse, UserMessage, find_action_field};
use crate::models::library::CaseStepResponse;
use crate::models::result::{ResultResponse, plan_transition};
use crate::models::{ResultAction, ResultStatus, TransitionError};

/// What an execution POST did.
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    /// The run case version the action addressed, when it was identified.
    pub run_case_version: Option<run_case_version::Model>,
    pub messages: Vec<UserMessage>,
}

impl ExecutionOutcome {
    fn error(run_case_version: Option<run_case_version::Model>, text: impl Into<String>) -> Self {
        Self {
            run_case_version,
            messages: vec![UserMessage::error(text)],
        }
    }
}

/// Apply the action in a submitted execution form.
///
/// Problems with the request itself (unknown action or run case version,
/// a transition the result's state does not allow) become user messages;
/// only storage failures are errors.
pub async fn apply_action(
    pool: &DbPool,
    run_id: i64,
    environment_id: i64,
    tester_id: i64,
    form: &HashMap<String, String>,
) -> AppResult<ExecutionOutcome> {
    let Some(field) = find_action_field(form) else {
        return Ok(ExecutionOutcome::default());
    };

    let action = match ResultAction::from_form(&field.name, form) {
        Ok(action) => action,
        Err(e) => return Ok(ExecutionOutcome::error(None, e.to_string())),
    };

    let rcv_id = match field.run_case_version_id {
        Ok(id) => id,
        Err(raw) => {
            return Ok(ExecutionOutcome::error(
                None,
                format!("{} is not a valid run/caseversion ID.", raw),
            ));
        }
    };
    let rcv = match pool.get_run_case_version(rcv_id).await? {
        Some(rcv) if rcv.run_id == run_id => rcv,
        _ => {
            return Ok(ExecutionOutcome::error(
                None,
                format!("{} is not a valid run/caseversion ID.", rcv_id),
            ));
        }
    };

    let result = match pool.find_result(rcv.id, tester_id, environment_id).await? {
        Some(result) => result,
        None if action == ResultAction::Start => {
            pool.insert_assigned_result(rcv.id, tester_id, environment_id)
                .await?
        }
        None => {
            return Ok(ExecutionOutcome::error(
                Some(rcv),
                TransitionError::NotStarted.to_string(),
            ));
        }
    };

    let planned = ResultStatus::parse(&result.status)
        .ok_or_else(|| TransitionError::UnknownStatus(result.status.clone()))
        .and_then(|current| plan_transition(current, &action, Utc::now()));
    let transition = match planned {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!(
                result_id = result.id,
                action = action.name(),
                status = %result.status,
                "Rejected result transition"
            );
            return Ok(ExecutionOutcome::error(Some(rcv), e.to_string()));
        }
    };

    let steps = if transition.failed_step.is_some() {
        pool.get_case_steps(&[rcv.case_version_id])
            .await?
            .remove(&rcv.case_version_id)
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    let result_id = result.id;
    let Some(updated) = pool
        .apply_result_transition(result, &transition, &steps)
        .await?
    else {
        tracing::debug!(result_id, action = action.name(), "Result changed before the write");
        return Ok(ExecutionOutcome::error(
            Some(rcv),
            TransitionError::Changed.to_string(),
        ));
    };
    tracing::info!(
        result_id = updated.id,
        run_case_version_id = rcv.id,
        tester_id,
        environment_id,
        action = action.name(),
        status = %updated.status,
        "Applied result action"
    );

    Ok(ExecutionOutcome {
        run_case_version: Some(rcv),
        messages: Vec::new(),
    })
}

/// Build execution rows for run case versions, with the tester's results in
/// one environment.
pub async fn load_execution_rows(
    pool: &DbPool,
    rcvs: Vec<run_case_version::Model>,
    tester_id: Option<i64>,
    environment_id: i64,
) -> AppResult<Vec<ExecutionRow>> {
    let rcv_ids: Vec<i64> = rcvs.iter().map(|r| r.id).collect();
    let cv_ids: Vec<i64> = rcvs.iter().map(|r| r.case_version_id).collect();

    let case_versions = pool.get_case_versions_by_ids(&cv_ids).await?;
    let mut snapshots = pool.get_run_case_version_environments(&rcv_ids).await?;
    let steps = pool.get_case_steps(&cv_ids).await?;

    let mut results = match tester_id {
        Some(tester_id) => {
            pool.get_tester_results(&rcv_ids, tester_id, environment_id)
                .await?
        }
        None => HashMap::new(),
    };
    let result_ids: Vec<i64> = results.values().map(|r| r.id).collect();
    let mut step_results = pool.get_step_results(&result_ids).await?;

    let mut rows = Vec::with_capacity(rcvs.len());
    for rcv in rcvs {
        let Some(cv) = case_versions.get(&rcv.case_version_id) else {
            continue;
        };
        let snapshot = snapshots.remove(&rcv.id).unwrap_or_default();
        let result = results.remove(&rcv.id).map(|r| {
            let srs = step_results.remove(&r.id).unwrap_or_default();
            ResultResponse::new(r, srs)
        });
        let case_steps = steps
            .get(&rcv.case_version_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(CaseStepResponse::from)
            .collect();

        rows.push(ExecutionRow {
            run_case_version: RunCaseVersionResponse::new(rcv, cv, &snapshot),
            steps: case_steps,
            result,
        });
    }

    Ok(rows)
}
