//! Run activation, cloning and run edits against a real database.

use casetrack_lib::error::AppError;
use casetrack_lib::models::library::CreateSuiteRequest;
use casetrack_lib::models::{LibraryStatus, RunStatus};
use casetrack_lib::services;

use super::helpers::*;

#[actix_rt::test]
async fn test_activate_locks_case_versions_in_suite_order() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = pool
        .insert_run(&run_request(&lib, "All envs", &lib.env_ids))
        .await
        .unwrap();

    let activated = services::activate_run(&pool, run.run.id).await.unwrap();
    assert_eq!(activated.status, RunStatus::Active.as_str());

    let rcvs = pool.get_run_case_versions(run.run.id).await.unwrap();
    assert_eq!(rcvs.len(), 2);
    assert_eq!(rcvs[0].case_version_id, lib.case_version_ids[0]);
    assert_eq!(rcvs[0].order, 1);
    assert_eq!(rcvs[1].case_version_id, lib.case_version_ids[1]);
    assert_eq!(rcvs[1].order, 2);

    let snapshots = pool
        .get_run_case_version_environments(&[rcvs[0].id, rcvs[1].id])
        .await
        .unwrap();
    assert_eq!(snapshots[&rcvs[0].id].to_vec(), lib.env_ids);
    // "Log out" only applies to the first two environments
    assert_eq!(snapshots[&rcvs[1].id].to_vec(), lib.env_ids[..2].to_vec());
}

#[actix_rt::test]
async fn test_activate_skips_cases_without_shared_environments() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;

    // Only runs on macOS, which the run below does not include
    let (mac_only, _) = pool
        .insert_case(
            lib.product_id,
            &case_version_request(lib.product_version_id, "Dock icon", &lib.env_ids[2..], 1),
        )
        .await
        .unwrap();
    let (suite, _) = pool
        .insert_suite(&CreateSuiteRequest {
            product_id: lib.product_id,
            name: "Mixed".to_string(),
            description: String::new(),
            status: LibraryStatus::Active,
            case_ids: vec![lib.case_ids[0], mac_only.id, lib.case_ids[1]],
        })
        .await
        .unwrap();

    let mut request = run_request(&lib, "Windows and Linux", &lib.env_ids[..2]);
    request.suite_ids = vec![suite.id];
    let run = pool.insert_run(&request).await.unwrap();
    services::activate_run(&pool, run.run.id).await.unwrap();

    let rcvs = pool.get_run_case_versions(run.run.id).await.unwrap();
    let orders: Vec<(i64, i32)> = rcvs.iter().map(|r| (r.case_version_id, r.order)).collect();
    assert_eq!(
        orders,
        vec![(lib.case_version_ids[0], 1), (lib.case_version_ids[1], 2)]
    );
}

#[actix_rt::test]
async fn test_activate_ignores_draft_case_versions() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;

    let mut draft = case_version_request(lib.product_version_id, "Unfinished", &lib.env_ids, 1);
    draft.status = LibraryStatus::Draft;
    let (draft_case, _) = pool.insert_case(lib.product_id, &draft).await.unwrap();
    pool.add_case_to_suite(lib.suite_id, draft_case.id)
        .await
        .unwrap();

    let run = seed_run(&pool, &lib).await;
    services::activate_run(&pool, run.run.id).await.unwrap();

    assert_eq!(pool.count_run_case_versions(run.run.id).await.unwrap(), 2);
}

#[actix_rt::test]
async fn test_reactivation_does_not_lock_again() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    let id = run.run.id;

    services::activate_run(&pool, id).await.unwrap();
    let disabled = pool.update_run_status(id, RunStatus::Disabled).await.unwrap();
    assert_eq!(disabled.status, "disabled");

    // A new case added to the suite after locking must not appear
    let (late, _) = pool
        .insert_case(
            lib.product_id,
            &case_version_request(lib.product_version_id, "Late", &lib.env_ids, 1),
        )
        .await
        .unwrap();
    pool.add_case_to_suite(lib.suite_id, late.id).await.unwrap();

    let reactivated = services::activate_run(&pool, id).await.unwrap();
    assert_eq!(reactivated.status, "active");
    assert_eq!(pool.count_run_case_versions(id).await.unwrap(), 2);
}

#[actix_rt::test]
async fn test_activate_missing_run() {
    let pool = create_test_pool().await;
    let err = services::activate_run(&pool, 999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[actix_rt::test]
async fn test_clone_copies_run_case_versions_and_snapshots() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = pool
        .insert_run(&run_request(&lib, "Nightly", &lib.env_ids))
        .await
        .unwrap();
    services::activate_run(&pool, run.run.id).await.unwrap();

    let cloned = pool.clone_run(run.run.id).await.unwrap();
    assert_eq!(cloned.run.name, "Cloned: Nightly");
    assert_eq!(cloned.run.status, "draft");
    assert_eq!(cloned.environments.to_vec(), lib.env_ids);

    let suites = pool.get_run_suites(cloned.run.id).await.unwrap();
    assert_eq!(suites.len(), 1);
    assert_eq!(suites[0].suite_id, lib.suite_id);

    let original = pool.get_run_case_versions(run.run.id).await.unwrap();
    let copied = pool.get_run_case_versions(cloned.run.id).await.unwrap();
    assert_eq!(copied.len(), original.len());
    for (a, b) in original.iter().zip(&copied) {
        assert_eq!(a.case_version_id, b.case_version_id);
        assert_eq!(a.order, b.order);
        assert_ne!(a.id, b.id);
    }

    let snaps = pool
        .get_run_case_version_environments(&[original[1].id, copied[1].id])
        .await
        .unwrap();
    assert_eq!(snaps[&original[1].id], snaps[&copied[1].id]);
}

#[actix_rt::test]
async fn test_removing_run_environment_updates_snapshots() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    services::activate_run(&pool, run.run.id).await.unwrap();

    // Drop Linux, add macOS
    let updated = pool
        .replace_run_environments(run.run.id, &[lib.env_ids[0], lib.env_ids[2]])
        .await
        .unwrap();
    assert_eq!(updated.environments.to_vec(), vec![lib.env_ids[0], lib.env_ids[2]]);

    let rcvs = pool.get_run_case_versions(run.run.id).await.unwrap();
    let ids: Vec<i64> = rcvs.iter().map(|r| r.id).collect();
    let snaps = pool.get_run_case_version_environments(&ids).await.unwrap();
    for id in ids {
        // macOS is not propagated, Linux is removed
        assert_eq!(snaps[&id].to_vec(), vec![lib.env_ids[0]]);
    }
}

#[actix_rt::test]
async fn test_suites_only_change_while_draft() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;

    let suites = pool.replace_run_suites(run.run.id, &[]).await.unwrap();
    assert!(suites.is_empty());

    services::activate_run(&pool, run.run.id).await.unwrap();
    let err = pool
        .replace_run_suites(run.run.id, &[lib.suite_id])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[actix_rt::test]
async fn test_run_rejects_end_date_before_start() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;

    let mut request = run_request(&lib, "Backwards", &lib.env_ids);
    request.start_date = chrono::NaiveDate::from_ymd_opt(2012, 1, 10);
    request.end_date = chrono::NaiveDate::from_ymd_opt(2012, 1, 9);

    match pool.insert_run(&request).await {
        Err(AppError::Validation(fields)) => assert_eq!(fields[0].field, "end_date"),
        other => panic!("expected a validation error, got {:?}", other.map(|r| r.run.id)),
    }
}

#[actix_rt::test]
async fn test_activating_a_clone_locks_once() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = pool
        .insert_run(&run_request(&lib, "Nightly", &lib.env_ids))
        .await
        .unwrap();
    services::activate_run(&pool, run.run.id).await.unwrap();

    let cloned = pool.clone_run(run.run.id).await.unwrap();
    services::activate_run(&pool, cloned.run.id).await.unwrap();

    let rcvs = pool.get_run_case_versions(cloned.run.id).await.unwrap();
    let orders: Vec<(i64, i32)> = rcvs.iter().map(|r| (r.case_version_id, r.order)).collect();
    assert_eq!(
        orders,
        vec![(lib.case_version_ids[0], 1), (lib.case_version_ids[1], 2)]
    );

    // Every locked row has its own snapshot; the copies are gone with theirs
    let ids: Vec<i64> = rcvs.iter().map(|r| r.id).collect();
    let snaps = pool.get_run_case_version_environments(&ids).await.unwrap();
    assert_eq!(snaps[&ids[0]].to_vec(), lib.env_ids);
    assert_eq!(snaps[&ids[1]].to_vec(), lib.env_ids[..2].to_vec());

    // The source run keeps its own rows
    assert_eq!(pool.count_run_case_versions(run.run.id).await.unwrap(), 2);
}
