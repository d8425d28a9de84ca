//! Run selection, environment selection and execution over HTTP.

use actix_web::http::StatusCode;
use actix_web::test;
use casetrack_lib::models::Role;
use casetrack_lib::services;

use super::helpers::*;

const AJAX: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

#[actix_rt::test]
async fn test_execution_requires_a_key() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::get().uri("/api/v1/runtests").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_viewer_cannot_execute() {
    let pool = create_test_pool().await;
    let (_, key) = seed_user(&pool, "viewer", Role::Viewer).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/runtests")
        .insert_header(("X-API-Key", key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = json_body(resp).await;
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("execution.execute")
    );
}

#[actix_rt::test]
async fn test_select_run_lists_only_active_runs() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let draft = pool
        .insert_run(&run_request(&lib, "B draft", &lib.env_ids))
        .await
        .unwrap();
    let active = pool
        .insert_run(&run_request(&lib, "A active", &lib.env_ids))
        .await
        .unwrap();
    services::activate_run(&pool, active.run.id).await.unwrap();
    let (_, key) = seed_user(&pool, "tester", Role::Tester).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/runtests?product_id={}",
            lib.product_id
        ))
        .insert_header(("X-API-Key", key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    let runs = body["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["id"], active.run.id);
    assert_ne!(runs[0]["id"], draft.run.id);
    assert_eq!(body["pagination"]["total"], 1);
}

#[actix_rt::test]
async fn test_environment_selection() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    let (_, key) = seed_user(&pool, "tester", Role::Tester).await;
    let app = create_test_app(&pool).await;

    // macOS is not one of the run's environments
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/runtests/{}/environment?environment={}",
            run.run.id, lib.env_ids[2]
        ))
        .insert_header(("X-API-Key", key.clone()))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["environments"].as_array().unwrap().len(), 2);
    assert!(body["current"].is_null());

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/runtests/{}/environment?environment={}",
            run.run.id, lib.env_ids[1]
        ))
        .insert_header(("X-API-Key", key))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["current"], lib.env_ids[1]);
}

#[actix_rt::test]
async fn test_post_environment_redirects_to_execution() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    let (_, key) = seed_user(&pool, "tester", Role::Tester).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/runtests/{}/environment", run.run.id))
        .insert_header(("X-API-Key", key.clone()))
        .set_form([("environment", lib.env_ids[0].to_string())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&resp),
        format!("/api/v1/runtests/{}/env/{}", run.run.id, lib.env_ids[0])
    );

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/runtests/{}/environment", run.run.id))
        .insert_header(("X-API-Key", key))
        .set_form([("environment", lib.env_ids[2].to_string())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["fields"][0]["field"], "environment");
}

#[actix_rt::test]
async fn test_scripted_environment_selection_returns_data() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    let (_, key) = seed_user(&pool, "tester", Role::Tester).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/runtests/{}/environment", run.run.id))
        .insert_header(("X-API-Key", key))
        .insert_header(AJAX)
        .set_form([("environment", lib.env_ids[1].to_string())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["run"]["id"], run.run.id);
    assert_eq!(body["environments"].as_array().unwrap().len(), 2);
    assert_eq!(body["current"], lib.env_ids[1]);
}

#[actix_rt::test]
async fn test_inactive_run_redirects_to_run_selection() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    let (_, key) = seed_user(&pool, "tester", Role::Tester).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/runtests/{}/env/{}",
            run.run.id, lib.env_ids[0]
        ))
        .insert_header(("X-API-Key", key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/api/v1/runtests");

    let body = json_body(resp).await;
    assert_eq!(body["messages"][0]["level"], "info");
    assert_eq!(
        body["messages"][0]["text"],
        "That test run is currently not open for testing. Please select a different test run."
    );
}

#[actix_rt::test]
async fn test_missing_run_is_not_found() {
    let pool = create_test_pool().await;
    let (_, key) = seed_user(&pool, "tester", Role::Tester).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/runtests/42/env/1")
        .insert_header(("X-API-Key", key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_wrong_environment_redirects_to_selection() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    services::activate_run(&pool, run.run.id).await.unwrap();
    let (_, key) = seed_user(&pool, "tester", Role::Tester).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/runtests/{}/env/{}",
            run.run.id, lib.env_ids[2]
        ))
        .insert_header(("X-API-Key", key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&resp),
        format!("/api/v1/runtests/{}/environment", run.run.id)
    );
}

#[actix_rt::test]
async fn test_execution_page_and_ajax_action() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    services::activate_run(&pool, run.run.id).await.unwrap();
    let (_, key) = seed_user(&pool, "tester", Role::Tester).await;
    let app = create_test_app(&pool).await;
    let uri = format!("/api/v1/runtests/{}/env/{}", run.run.id, lib.env_ids[0]);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(("X-API-Key", key.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = json_body(resp).await;
    assert_eq!(page["environment"]["id"], lib.env_ids[0]);
    assert_eq!(page["product_version"]["version"], "10.0");
    let rows = page["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0]["result"].is_null());
    let rcv_id = rows[0]["run_case_version"]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(("X-API-Key", key.clone()))
        .insert_header(AJAX)
        .set_form([("action-start", rcv_id.to_string())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fragment = json_body(resp).await;
    assert_eq!(fragment["no_replace"], false);
    assert_eq!(fragment["row"]["run_case_version"]["id"], rcv_id);
    assert_eq!(fragment["row"]["result"]["status"], "started");
    assert!(fragment["messages"].as_array().unwrap().is_empty());

    // Unknown actions identify no row
    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(("X-API-Key", key))
        .insert_header(AJAX)
        .set_form([("action-explode", rcv_id.to_string())])
        .to_request();
    let fragment = json_body(test::call_service(&app, req).await).await;
    assert_eq!(fragment["no_replace"], true);
    assert_eq!(fragment["messages"][0]["text"], "explode is not a valid action.");
}

#[actix_rt::test]
async fn test_full_page_action_redirects_back() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    services::activate_run(&pool, run.run.id).await.unwrap();
    let (tester_id, key) = seed_user(&pool, "tester", Role::Tester).await;
    let rcv = pool.get_run_case_versions(run.run.id).await.unwrap()[0].clone();
    let app = create_test_app(&pool).await;
    let uri = format!(
        "/api/v1/runtests/{}/env/{}?page=2",
        run.run.id, lib.env_ids[1]
    );

    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(("X-API-Key", key))
        .set_form([("action-finishsucceed", rcv.id.to_string())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), uri);
    let body = json_body(resp).await;
    assert_eq!(body["messages"][0]["level"], "error");
    assert_eq!(
        body["messages"][0]["text"],
        "Can't finish a result that was never started."
    );
    assert!(
        pool.find_result(rcv.id, tester_id, lib.env_ids[1])
            .await
            .unwrap()
            .is_none()
    );
}

#[actix_rt::test]
async fn test_admin_key_cannot_record_results() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    services::activate_run(&pool, run.run.id).await.unwrap();
    let rcv = pool.get_run_case_versions(run.run.id).await.unwrap()[0].clone();
    let app = create_test_app(&pool).await;
    let uri = format!("/api/v1/runtests/{}/env/{}", run.run.id, lib.env_ids[0]);

    // Viewing works without a tester identity
    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
        .set_form([("action-start", rcv.id.to_string())])
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );
}
