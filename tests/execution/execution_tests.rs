//! Result actions applied through the execution service.

use std::collections::HashMap;

use casetrack_lib::db::DbPool;
use casetrack_lib::entity::run_case_version;
use casetrack_lib::models::execution::MessageLevel;
use casetrack_lib::models::result::plan_transition;
use casetrack_lib::models::{ResultAction, ResultStatus, Role};
use casetrack_lib::services::{self, ExecutionOutcome};

use super::helpers::*;

struct Fixture {
    pool: DbPool,
    lib: Library,
    run_id: i64,
    env_id: i64,
    tester_id: i64,
    rcvs: Vec<run_case_version::Model>,
}

async fn active_run() -> Fixture {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    services::activate_run(&pool, run.run.id).await.unwrap();
    let (tester_id, _) = seed_user(&pool, "tester", Role::Tester).await;
    let rcvs = pool.get_run_case_versions(run.run.id).await.unwrap();
    Fixture {
        env_id: lib.env_ids[0],
        pool,
        lib,
        run_id: run.run.id,
        tester_id,
        rcvs,
    }
}

fn form(pairs: &[(&str, String)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

impl Fixture {
    async fn act(&self, pairs: &[(&str, String)]) -> ExecutionOutcome {
        services::apply_action(
            &self.pool,
            self.run_id,
            self.env_id,
            self.tester_id,
            &form(pairs),
        )
        .await
        .unwrap()
    }

    async fn status(&self, rcv_id: i64) -> Option<String> {
        self.pool
            .find_result(rcv_id, self.tester_id, self.env_id)
            .await
            .unwrap()
            .map(|r| r.status)
    }
}

#[actix_rt::test]
async fn test_start_creates_result() {
    let fx = active_run().await;
    let rcv = &fx.rcvs[0];

    let outcome = fx.act(&[("action-start", rcv.id.to_string())]).await;
    assert!(outcome.messages.is_empty());
    assert_eq!(outcome.run_case_version.map(|r| r.id), Some(rcv.id));
    assert_eq!(fx.status(rcv.id).await.as_deref(), Some("started"));
}

#[actix_rt::test]
async fn test_reverse_action_field_form() {
    let fx = active_run().await;
    let rcv = &fx.rcvs[1];

    let key = format!("action-{}", rcv.id);
    fx.act(&[(key.as_str(), "start".to_string())]).await;
    assert_eq!(fx.status(rcv.id).await.as_deref(), Some("started"));
}

#[actix_rt::test]
async fn test_pass_then_restart() {
    let fx = active_run().await;
    let id = fx.rcvs[0].id.to_string();

    fx.act(&[("action-start", id.clone())]).await;
    fx.act(&[("action-finishsucceed", id.clone())]).await;
    let passed = fx
        .pool
        .find_result(fx.rcvs[0].id, fx.tester_id, fx.env_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(passed.status, ResultStatus::Passed.as_str());
    assert!(passed.completed_at.is_some());

    fx.act(&[("action-restart", id)]).await;
    let restarted = fx
        .pool
        .find_result(fx.rcvs[0].id, fx.tester_id, fx.env_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restarted.status, "started");
    assert!(restarted.completed_at.is_none());
    assert_eq!(restarted.id, passed.id);
}

#[actix_rt::test]
async fn test_fail_records_step_result() {
    let fx = active_run().await;
    let rcv = &fx.rcvs[0];
    let id = rcv.id.to_string();

    fx.act(&[("action-start", id.clone())]).await;
    let outcome = fx
        .act(&[
            ("action-finishfail", id),
            ("stepnumber", "2".to_string()),
            ("comment", "crashed".to_string()),
            ("bug", "http://bugzilla.example.com/123".to_string()),
        ])
        .await;
    assert!(outcome.messages.is_empty());

    let result = fx
        .pool
        .find_result(rcv.id, fx.tester_id, fx.env_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.status, "failed");
    assert_eq!(result.comment, "crashed");

    let steps = fx
        .pool
        .get_case_steps(&[rcv.case_version_id])
        .await
        .unwrap()
        .remove(&rcv.case_version_id)
        .unwrap();
    let step_results = fx
        .pool
        .get_step_results(&[result.id])
        .await
        .unwrap()
        .remove(&result.id)
        .unwrap();
    assert_eq!(step_results.len(), 1);
    assert_eq!(step_results[0].step_id, steps[1].id);
    assert_eq!(step_results[0].status, "failed");
    assert_eq!(step_results[0].bug_url, "http://bugzilla.example.com/123");
}

#[actix_rt::test]
async fn test_fail_with_unknown_step_is_still_a_failure() {
    let fx = active_run().await;
    let rcv = &fx.rcvs[1];
    let id = rcv.id.to_string();

    fx.act(&[("action-start", id.clone())]).await;
    fx.act(&[("action-finishfail", id), ("stepnumber", "7".to_string())])
        .await;

    let result = fx
        .pool
        .find_result(rcv.id, fx.tester_id, fx.env_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.status, "failed");
    assert!(
        fx.pool
            .get_step_results(&[result.id])
            .await
            .unwrap()
            .is_empty()
    );
}

#[actix_rt::test]
async fn test_finish_without_start() {
    let fx = active_run().await;
    let rcv = &fx.rcvs[0];

    let outcome = fx
        .act(&[("action-finishsucceed", rcv.id.to_string())])
        .await;
    assert_eq!(outcome.messages.len(), 1);
    assert_eq!(outcome.messages[0].level, MessageLevel::Error);
    assert_eq!(
        outcome.messages[0].text,
        "Can't finish a result that was never started."
    );
    assert!(outcome.run_case_version.is_some());
    assert_eq!(fx.status(rcv.id).await, None);
}

#[actix_rt::test]
async fn test_start_twice_is_rejected() {
    let fx = active_run().await;
    let id = fx.rcvs[0].id.to_string();

    fx.act(&[("action-start", id.clone())]).await;
    let outcome = fx.act(&[("action-start", id)]).await;
    assert_eq!(outcome.messages.len(), 1);
    assert_eq!(fx.status(fx.rcvs[0].id).await.as_deref(), Some("started"));
}

#[actix_rt::test]
async fn test_unknown_action() {
    let fx = active_run().await;

    let outcome = fx
        .act(&[("action-explode", fx.rcvs[0].id.to_string())])
        .await;
    assert!(outcome.run_case_version.is_none());
    assert_eq!(outcome.messages[0].text, "explode is not a valid action.");
}

#[actix_rt::test]
async fn test_unknown_action_checked_before_run_case_version() {
    let fx = active_run().await;

    let outcome = fx.act(&[("action-explode", "999".to_string())]).await;
    assert_eq!(outcome.messages[0].text, "explode is not a valid action.");
}

#[actix_rt::test]
async fn test_run_case_version_of_another_run() {
    let fx = active_run().await;
    let other = fx
        .pool
        .insert_run(&run_request(&fx.lib, "Other", &fx.lib.env_ids))
        .await
        .unwrap();
    services::activate_run(&fx.pool, other.run.id).await.unwrap();
    let foreign = fx.pool.get_run_case_versions(other.run.id).await.unwrap()[0].id;

    let outcome = fx.act(&[("action-start", foreign.to_string())]).await;
    assert!(outcome.run_case_version.is_none());
    assert_eq!(
        outcome.messages[0].text,
        format!("{} is not a valid run/caseversion ID.", foreign)
    );
    assert_eq!(fx.status(foreign).await, None);
}

#[actix_rt::test]
async fn test_non_numeric_run_case_version() {
    let fx = active_run().await;

    let outcome = fx.act(&[("action-start", "abc".to_string())]).await;
    assert_eq!(
        outcome.messages[0].text,
        "abc is not a valid run/caseversion ID."
    );
}

#[actix_rt::test]
async fn test_form_without_action_does_nothing() {
    let fx = active_run().await;

    let outcome = fx.act(&[("comment", "hello".to_string())]).await;
    assert!(outcome.run_case_version.is_none());
    assert!(outcome.messages.is_empty());
}

#[actix_rt::test]
async fn test_results_are_per_environment() {
    let fx = active_run().await;
    let rcv = &fx.rcvs[0];

    fx.act(&[("action-start", rcv.id.to_string())]).await;

    let other_env = fx.lib.env_ids[1];
    assert!(
        fx.pool
            .find_result(rcv.id, fx.tester_id, other_env)
            .await
            .unwrap()
            .is_none()
    );

    let rows = services::load_execution_rows(&fx.pool, fx.rcvs.clone(), Some(fx.tester_id), other_env)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.result.is_none()));

    let rows = services::load_execution_rows(&fx.pool, fx.rcvs.clone(), Some(fx.tester_id), fx.env_id)
        .await
        .unwrap();
    assert_eq!(rows[0].steps.len(), 3);
    assert_eq!(
        rows[0].result.as_ref().map(|r| r.status),
        Some(ResultStatus::Started)
    );
    assert!(rows[1].result.is_none());
}

#[actix_rt::test]
async fn test_stale_transition_is_not_written() {
    let fx = active_run().await;
    let rcv = &fx.rcvs[0];
    let id = rcv.id.to_string();

    fx.act(&[("action-start", id.clone())]).await;
    let stale = fx
        .pool
        .find_result(rcv.id, fx.tester_id, fx.env_id)
        .await
        .unwrap()
        .unwrap();

    // Another request finishes the result after `stale` was read
    fx.act(&[("action-finishsucceed", id)]).await;

    let transition = plan_transition(
        ResultStatus::Started,
        &ResultAction::FinishFail {
            step_number: None,
            comment: "late".to_string(),
            bug_url: String::new(),
        },
        chrono::Utc::now(),
    )
    .unwrap();
    let written = fx
        .pool
        .apply_result_transition(stale, &transition, &[])
        .await
        .unwrap();
    assert!(written.is_none());

    let current = fx
        .pool
        .find_result(rcv.id, fx.tester_id, fx.env_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.status, "passed");
    assert_eq!(current.comment, "");
}
