//! Shared helpers: an in-memory database, library fixtures and a test app.

use actix_web::{App, dev::ServiceResponse, test, web};
use casetrack_lib::auth::AdminKey;
use casetrack_lib::db::DbPool;
use casetrack_lib::models::library::{CreateCaseVersionRequest, CreateSuiteRequest, LibraryStatus, NewCaseStep};
use casetrack_lib::models::run::CreateRunRequest;
use casetrack_lib::models::{Role, RunWithEnvironments};
use casetrack_lib::services::user_keys;
use casetrack_lib::{api, middleware};
use serde_json::Value;

/// Admin key used in tests.
pub const TEST_ADMIN_KEY: &str = "test-admin-key";

/// A fresh, migrated in-memory database.
pub async fn create_test_pool() -> DbPool {
    let pool = DbPool::connect("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory database");
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    pool
}

/// Ids of a small library: one product and version, three environments and
/// two active cases with three and one steps.
pub struct Library {
    pub product_id: i64,
    pub product_version_id: i64,
    pub env_ids: Vec<i64>,
    pub case_ids: Vec<i64>,
    pub case_version_ids: Vec<i64>,
    pub suite_id: i64,
}

pub fn case_version_request(
    product_version_id: i64,
    name: &str,
    env_ids: &[i64],
    steps: usize,
) -> CreateCaseVersionRequest {
    CreateCaseVersionRequest {
        product_version_id,
        name: name.to_string(),
        description: String::new(),
        status: LibraryStatus::Active,
        environment_ids: env_ids.to_vec(),
        steps: (1..=steps)
            .map(|n| NewCaseStep {
                instruction: format!("step {}", n),
                expected: format!("expected {}", n),
            })
            .collect(),
    }
}

pub async fn seed_library(pool: &DbPool) -> Library {
    let product = pool.insert_product("Firefox", "").await.unwrap();
    let version = pool
        .insert_product_version(product.id, "10.0", "")
        .await
        .unwrap();

    let mut env_ids = Vec::new();
    for name in ["Windows", "Linux", "macOS"] {
        env_ids.push(pool.insert_environment(name).await.unwrap().id);
    }

    let (login, login_cv) = pool
        .insert_case(
            product.id,
            &case_version_request(version.id, "Log in", &env_ids, 3),
        )
        .await
        .unwrap();
    let (logout, logout_cv) = pool
        .insert_case(
            product.id,
            &case_version_request(version.id, "Log out", &env_ids[..2], 1),
        )
        .await
        .unwrap();

    let (suite, _) = pool
        .insert_suite(&CreateSuiteRequest {
            product_id: product.id,
            name: "Smoke".to_string(),
            description: String::new(),
            status: LibraryStatus::Active,
            case_ids: vec![login.id, logout.id],
        })
        .await
        .unwrap();

    Library {
        product_id: product.id,
        product_version_id: version.id,
        env_ids,
        case_ids: vec![login.id, logout.id],
        case_version_ids: vec![login_cv.case_version.id, logout_cv.case_version.id],
        suite_id: suite.id,
    }
}

pub fn run_request(lib: &Library, name: &str, env_ids: &[i64]) -> CreateRunRequest {
    CreateRunRequest {
        product_version_id: lib.product_version_id,
        name: name.to_string(),
        description: String::new(),
        start_date: None,
        end_date: None,
        environment_ids: env_ids.to_vec(),
        suite_ids: vec![lib.suite_id],
    }
}

/// A draft run over the library's suite, in the first two environments.
pub async fn seed_run(pool: &DbPool, lib: &Library) -> RunWithEnvironments {
    pool.insert_run(&run_request(lib, "Smoke run", &lib.env_ids[..2]))
        .await
        .unwrap()
}

/// Create a user and return its id and key.
pub async fn seed_user(pool: &DbPool, username: &str, role: Role) -> (i64, String) {
    let (user, key) = user_keys::create_user(pool, username, role).await.unwrap();
    (user.id, key)
}

/// Create the test app with every API route mounted.
pub async fn create_test_app(
    pool: &DbPool,
) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .wrap(middleware::RequestLogger)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(AdminKey::new(Some(TEST_ADMIN_KEY.to_string()))))
            .service(
                web::scope(api::API_PREFIX)
                    .configure(api::configure_health_routes)
                    .configure(api::configure_library_routes)
                    .configure(api::configure_run_routes)
                    .configure(api::configure_runtests_routes)
                    .configure(api::configure_result_routes)
                    .configure(api::configure_user_routes),
            ),
    )
    .await
}

/// Read a response body as JSON.
pub async fn json_body(resp: ServiceResponse) -> Value {
    let bytes = test::read_body(resp).await;
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// `Location` header of a redirect.
pub fn location(resp: &ServiceResponse) -> String {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
