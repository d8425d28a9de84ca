//! Database queries for results and step results.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

use crate::entity::test_result::{self, ActiveModel, Entity as TestResult};
use crate::entity::{case_step, step_result};
use crate::error::{AppError, AppResult};
use crate::models::result::{ListResultsQuery, Transition};
use crate::models::{PaginationParams, ResultStatus, ReviewStatus, StepResultStatus};

use super::{DbPool, is_unique_violation};

impl DbPool {
    pub async fn get_result(&self, id: i64) -> AppResult<Option<test_result::Model>> {
        TestResult::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get result: {}", e)))
    }

    /// The result of one tester for one run case version in one environment.
    pub async fn find_result(
        &self,
        run_case_version_id: i64,
        tester_id: i64,
        environment_id: i64,
    ) -> AppResult<Option<test_result::Model>> {
        TestResult::find()
            .filter(test_result::Column::RunCaseVersionId.eq(run_case_version_id))
            .filter(test_result::Column::TesterId.eq(tester_id))
            .filter(test_result::Column::EnvironmentId.eq(environment_id))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to find result: {}", e)))
    }

    /// Create an `assigned` result.
    ///
    /// If a concurrent request created the same result first, that row is
    /// returned instead.
    pub async fn insert_assigned_result(
        &self,
        run_case_version_id: i64,
        tester_id: i64,
        environment_id: i64,
    ) -> AppResult<test_result::Model> {
        let now = Utc::now();
        let model = ActiveModel {
            tester_id: Set(tester_id),
            run_case_version_id: Set(run_case_version_id),
            environment_id: Set(environment_id),
            status: Set(ResultStatus::Assigned.as_str().to_string()),
            review: Set(ReviewStatus::Pending.as_str().to_string()),
            started_at: Set(now),
            completed_at: Set(None),
            comment: Set(String::new()),
            reviewed_at: Set(None),
            reviewed_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match model.insert(self.connection()).await {
            Ok(result) => Ok(result),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(
                    run_case_version_id,
                    tester_id,
                    environment_id,
                    "Result created concurrently, using existing row"
                );
                self.find_result(run_case_version_id, tester_id, environment_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Database("Result vanished after unique violation".to_string())
                    })
            }
            Err(e) => Err(AppError::Database(format!("Failed to insert result: {}", e))),
        }
    }

    /// Write a planned transition to a result.
    ///
    /// The write only applies while the result still has the status it was
    /// read with; `None` means another request changed it first and nothing
    /// was written. A failed step is recorded against the case step with
    /// that number in `steps`; an unknown step number is ignored.
    pub async fn apply_result_transition(
        &self,
        result: test_result::Model,
        transition: &Transition,
        steps: &[case_step::Model],
    ) -> AppResult<Option<test_result::Model>> {
        let now = Utc::now();
        let result_id = result.id;
        let previous_status = result.status.clone();

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut active: ActiveModel = result.into();
        active.status = Set(transition.status.as_str().to_string());
        if let Some(started_at) = transition.started_at {
            active.started_at = Set(started_at);
        }
        if let Some(completed_at) = transition.completed_at {
            active.completed_at = Set(completed_at);
        }
        if let Some(comment) = &transition.comment {
            active.comment = Set(comment.clone());
        }
        active.updated_at = Set(now);

        let written = TestResult::update_many()
            .set(active)
            .filter(test_result::Column::Id.eq(result_id))
            .filter(test_result::Column::Status.eq(previous_status.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update result: {}", e)))?;
        if written.rows_affected == 0 {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(format!("Failed to roll back result: {}", e)))?;
            tracing::debug!(
                result_id,
                status = %previous_status,
                "Result changed concurrently, transition not applied"
            );
            return Ok(None);
        }

        let updated = TestResult::find_by_id(result_id)
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to reload result: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Result {}", result_id)))?;

        if let Some(failed) = &transition.failed_step {
            match steps.iter().find(|s| s.number == failed.step_number) {
                Some(step) => {
                    let existing = step_result::Entity::find()
                        .filter(step_result::Column::ResultId.eq(result_id))
                        .filter(step_result::Column::StepId.eq(step.id))
                        .one(&txn)
                        .await
                        .map_err(|e| {
                            AppError::Database(format!("Failed to get step result: {}", e))
                        })?;

                    let write = match existing {
                        Some(sr) => {
                            let mut active: step_result::ActiveModel = sr.into();
                            active.status = Set(StepResultStatus::Failed.as_str().to_string());
                            active.bug_url = Set(failed.bug_url.clone());
                            active.updated_at = Set(now);
                            active.update(&txn).await
                        }
                        None => {
                            step_result::ActiveModel {
                                result_id: Set(result_id),
                                step_id: Set(step.id),
                                status: Set(StepResultStatus::Failed.as_str().to_string()),
                                bug_url: Set(failed.bug_url.clone()),
                                created_at: Set(now),
                                updated_at: Set(now),
                                ..Default::default()
                            }
                            .insert(&txn)
                            .await
                        }
                    };
                    write.map_err(|e| {
                        AppError::Database(format!("Failed to record step result: {}", e))
                    })?;
                }
                None => {
                    tracing::debug!(
                        result_id,
                        step_number = failed.step_number,
                        "Ignoring failure of unknown step"
                    );
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit result: {}", e)))?;

        Ok(Some(updated))
    }

    /// Step results of several results, keyed by result id.
    pub async fn get_step_results(
        &self,
        result_ids: &[i64],
    ) -> AppResult<HashMap<i64, Vec<step_result::Model>>> {
        let mut out: HashMap<i64, Vec<step_result::Model>> = HashMap::new();
        if result_ids.is_empty() {
            return Ok(out);
        }

        let rows = step_result::Entity::find()
            .filter(step_result::Column::ResultId.is_in(result_ids.to_vec()))
            .order_by_asc(step_result::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get step results: {}", e)))?;

        for row in rows {
            out.entry(row.result_id).or_default().push(row);
        }
        Ok(out)
    }

    /// One tester's results in one environment, keyed by run case version id.
    pub async fn get_tester_results(
        &self,
        run_case_version_ids: &[i64],
        tester_id: i64,
        environment_id: i64,
    ) -> AppResult<HashMap<i64, test_result::Model>> {
        if run_case_version_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = TestResult::find()
            .filter(test_result::Column::RunCaseVersionId.is_in(run_case_version_ids.to_vec()))
            .filter(test_result::Column::TesterId.eq(tester_id))
            .filter(test_result::Column::EnvironmentId.eq(environment_id))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get results: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.run_case_version_id, r))
            .collect())
    }

    /// All results recorded for a run case version.
    pub async fn get_results_for_run_case_version(
        &self,
        run_case_version_id: i64,
    ) -> AppResult<Vec<test_result::Model>> {
        TestResult::find()
            .filter(test_result::Column::RunCaseVersionId.eq(run_case_version_id))
            .order_by_asc(test_result::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get results: {}", e)))
    }

    /// List results with optional filtering.
    pub async fn list_results(
        &self,
        query: &ListResultsQuery,
    ) -> AppResult<(Vec<test_result::Model>, u64)> {
        let mut select = TestResult::find();

        if let Some(rcv) = query.run_case_version_id {
            select = select.filter(test_result::Column::RunCaseVersionId.eq(rcv));
        }
        if let Some(tester) = query.tester_id {
            select = select.filter(test_result::Column::TesterId.eq(tester));
        }
        if let Some(env) = query.environment_id {
            select = select.filter(test_result::Column::EnvironmentId.eq(env));
        }
        if let Some(status) = query.status {
            select = select.filter(test_result::Column::Status.eq(status.as_str()));
        }
        if let Some(review) = query.review {
            select = select.filter(test_result::Column::Review.eq(review.as_str()));
        }

        let total = select
            .clone()
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count results: {}", e)))?;

        let params = PaginationParams::new(query.page, query.limit);
        let results = select
            .order_by_desc(test_result::Column::UpdatedAt)
            .order_by_desc(test_result::Column::Id)
            .offset(params.offset())
            .limit(params.clamped_limit() as u64)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list results: {}", e)))?;

        Ok((results, total))
    }

    /// Mark a result reviewed.
    pub async fn review_result(
        &self,
        id: i64,
        reviewer_id: Option<i64>,
    ) -> AppResult<test_result::Model> {
        let result = self
            .get_result(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Result {}", id)))?;

        if ReviewStatus::parse(&result.review) == Some(ReviewStatus::Reviewed) {
            return Err(AppError::Conflict(format!(
                "Result {} has already been reviewed",
                id
            )));
        }

        let now = Utc::now();
        let mut active: ActiveModel = result.into();
        active.review = Set(ReviewStatus::Reviewed.as_str().to_string());
        active.reviewed_at = Set(Some(now));
        active.reviewed_by = Set(reviewer_id);
        active.updated_at = Set(now);

        active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to review result: {}", e)))
    }
}
