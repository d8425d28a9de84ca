//! Library, run, result and user management over HTTP.

use actix_web::http::StatusCode;
use actix_web::test;
use casetrack_lib::models::Role;
use casetrack_lib::services;
use serde_json::json;

use super::helpers::*;

const ADMIN: (&str, &str) = ("X-Admin-Key", TEST_ADMIN_KEY);

#[actix_rt::test]
async fn test_build_library_over_http() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/products")
        .insert_header(ADMIN)
        .set_json(json!({ "name": "Thunderbird" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product_id = json_body(resp).await["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/products/{}/versions", product_id))
        .insert_header(ADMIN)
        .set_json(json!({ "version": "3.1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let version_id = json_body(resp).await["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/environments")
        .insert_header(ADMIN)
        .set_json(json!({ "name": "Windows 7" }))
        .to_request();
    let env_id = json_body(test::call_service(&app, req).await).await["id"]
        .as_i64()
        .unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/cases")
        .insert_header(ADMIN)
        .set_json(json!({
            "product_id": product_id,
            "version": {
                "product_version_id": version_id,
                "name": "Send mail",
                "status": "active",
                "environment_ids": [env_id],
                "steps": [
                    { "instruction": "Compose", "expected": "Editor opens" },
                    { "instruction": "Send" }
                ]
            }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let case_version = json_body(resp).await;
    assert_eq!(case_version["status"], "active");
    assert_eq!(case_version["environment_ids"], json!([env_id]));
    let steps = case_version["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[1]["number"], 2);
    assert_eq!(steps[1]["expected"], "");

    let req = test::TestRequest::post()
        .uri("/api/v1/suites")
        .insert_header(ADMIN)
        .set_json(json!({
            "product_id": product_id,
            "name": "Mail",
            "status": "active",
            "case_ids": [case_version["case_id"]]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["case_ids"], json!([case_version["case_id"]]));
}

#[actix_rt::test]
async fn test_tester_cannot_manage_library() {
    let pool = create_test_pool().await;
    let (_, key) = seed_user(&pool, "tester", Role::Tester).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/environments")
        .insert_header(("X-API-Key", key))
        .set_json(json!({ "name": "Linux" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[actix_rt::test]
async fn test_run_lifecycle_over_http() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/runs")
        .insert_header(ADMIN)
        .set_json(json!({
            "product_version_id": lib.product_version_id,
            "name": "Release smoke",
            "environment_ids": lib.env_ids,
            "suite_ids": [lib.suite_id]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let run = json_body(resp).await;
    assert_eq!(run["status"], "draft");
    assert_eq!(run["case_version_count"], 0);
    let run_id = run["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/runs/{}/activate", run_id))
        .insert_header(ADMIN)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let run = json_body(resp).await;
    assert_eq!(run["status"], "active");
    assert_eq!(run["case_version_count"], 2);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/runs/{}/suites", run_id))
        .insert_header(ADMIN)
        .set_json(json!({ "suite_ids": [] }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CONFLICT
    );

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/runs/{}/clone", run_id))
        .insert_header(ADMIN)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let cloned = json_body(resp).await;
    assert_eq!(cloned["name"], "Cloned: Release smoke");
    assert_eq!(cloned["status"], "draft");
    assert_eq!(cloned["case_version_count"], 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/runs?name=cloned")
        .insert_header(ADMIN)
        .to_request();
    let listed = json_body(test::call_service(&app, req).await).await;
    assert_eq!(listed["runs"].as_array().unwrap().len(), 1);
    assert_eq!(listed["runs"][0]["id"], cloned["id"]);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/runs/{}", run_id))
        .insert_header(ADMIN)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/runs/{}", run_id))
        .insert_header(ADMIN)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_rt::test]
async fn test_run_case_version_name_filter() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    services::activate_run(&pool, run.run.id).await.unwrap();
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/runcaseversions?run_id={}&name=LOG%20OUT", run.run.id))
        .insert_header(ADMIN)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    let rows = body["run_case_versions"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Log out");
    assert_eq!(body["pagination"]["total"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/runcaseversions?run_id={}&name=log", run.run.id))
        .insert_header(ADMIN)
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["pagination"]["total"], 2);
}

#[actix_rt::test]
async fn test_create_run_validation() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/runs")
        .insert_header(ADMIN)
        .set_json(json!({
            "product_version_id": lib.product_version_id,
            "name": "Backwards",
            "start_date": "2012-01-10",
            "end_date": "2012-01-09"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["fields"][0]["field"], "end_date");
}

#[actix_rt::test]
async fn test_review_and_bug_urls() {
    let pool = create_test_pool().await;
    let lib = seed_library(&pool).await;
    let run = seed_run(&pool, &lib).await;
    services::activate_run(&pool, run.run.id).await.unwrap();
    let (tester_id, tester_key) = seed_user(&pool, "tester", Role::Tester).await;
    let (_, manager_key) = seed_user(&pool, "manager", Role::Manager).await;
    let rcv = pool.get_run_case_versions(run.run.id).await.unwrap()[0].clone();
    let app = create_test_app(&pool).await;
    let uri = format!("/api/v1/runtests/{}/env/{}", run.run.id, lib.env_ids[0]);

    for form in [
        vec![("action-start", rcv.id.to_string())],
        vec![
            ("action-finishfail", rcv.id.to_string()),
            ("stepnumber", "1".to_string()),
            ("bug", "http://bugzilla.example.com/99".to_string()),
        ],
    ] {
        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(("X-API-Key", tester_key.clone()))
            .set_form(form)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::SEE_OTHER
        );
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/runcaseversions/{}", rcv.id))
        .insert_header(("X-API-Key", tester_key.clone()))
        .to_request();
    let detail = json_body(test::call_service(&app, req).await).await;
    assert_eq!(detail["results"].as_array().unwrap().len(), 1);
    assert_eq!(detail["results"][0]["status"], "failed");
    assert_eq!(detail["results"][0]["review"], "pending");
    assert_eq!(detail["bug_urls"], json!(["http://bugzilla.example.com/99"]));
    let result_id = detail["results"][0]["id"].as_i64().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/results?tester_id={}&status=failed", tester_id))
        .insert_header(("X-API-Key", tester_key.clone()))
        .to_request();
    let listed = json_body(test::call_service(&app, req).await).await;
    assert_eq!(listed["pagination"]["total"], 1);

    let review_uri = format!("/api/v1/results/{}/review", result_id);
    let req = test::TestRequest::post()
        .uri(&review_uri)
        .insert_header(("X-API-Key", tester_key))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::post()
        .uri(&review_uri)
        .insert_header(("X-API-Key", manager_key.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let reviewed = json_body(resp).await;
    assert_eq!(reviewed["review"], "reviewed");
    assert!(reviewed["reviewed_by"].is_i64());

    let req = test::TestRequest::post()
        .uri(&review_uri)
        .insert_header(("X-API-Key", manager_key))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CONFLICT
    );
}

#[actix_rt::test]
async fn test_user_management() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .insert_header(ADMIN)
        .set_json(json!({ "username": "alice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = json_body(resp).await;
    assert_eq!(created["role"], "tester");
    let key = created["key"].as_str().unwrap().to_string();
    let user_id = created["id"].as_i64().unwrap();

    // The new key works and carries the tester role
    let req = test::TestRequest::get()
        .uri("/api/v1/runtests")
        .insert_header(("X-API-Key", key.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/v1/users")
        .insert_header(("X-API-Key", key.clone()))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .insert_header(ADMIN)
        .set_json(json!({ "username": "bob", "role": "overlord" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["fields"][0]["field"], "role");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/users/{}/revoke", user_id))
        .insert_header(ADMIN)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/v1/runtests")
        .insert_header(("X-API-Key", key))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/users/{}/revoke", user_id))
        .insert_header(ADMIN)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}
