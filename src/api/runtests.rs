//! Test execution handlers: run selection, environment selection and the
//! execution screen.
//!
//! The selected environment is part of the URL
//! (`/runtests/{run_id}/env/{env_id}`); nothing is kept in a session.

use std::collections::HashMap;

use actix_web::{HttpRequest, HttpResponse, web};

use super::{API_PREFIX, full_path, is_ajax, see_other};
use crate::auth::Caller;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::execution::{
    EnvironmentQuery, EnvironmentSelectionForm, EnvironmentSelectionResponse, ExecutionFragment,
    ProductVersionSummary, RunExecutionResponse, SelectRunQuery, SelectRunResponse, UserMessage,
};
use crate::models::run::RunSummary;
use crate::models::{
    EnvironmentResponse, HasEnvironments, Pagination, PaginationParams, Permission,
    RunWithEnvironments,
};
use crate::services::{self, ExecutionOutcome};

/// Message shown when a run that is not active is opened for testing.
pub const RUN_NOT_OPEN_MESSAGE: &str =
    "That test run is currently not open for testing. Please select a different test run.";

fn environment_selection_path(run_id: i64) -> String {
    format!("{}/runtests/{}/environment", API_PREFIX, run_id)
}

fn execution_path(run_id: i64, env_id: i64) -> String {
    format!("{}/runtests/{}/env/{}", API_PREFIX, run_id, env_id)
}

async fn require_run(pool: &DbPool, run_id: i64) -> AppResult<RunWithEnvironments> {
    pool.get_run_with_environments(run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Run {}", run_id)))
}

/// Where an execution request must go instead, if the run is not open or the
/// environment is not one of the run's.
fn execution_redirect(run: &RunWithEnvironments, env_id: i64) -> Option<HttpResponse> {
    if !run.is_active() {
        return Some(see_other(
            format!("{}/runtests", API_PREFIX),
            vec![UserMessage::info(RUN_NOT_OPEN_MESSAGE)],
        ));
    }
    if !run.supports_environment(env_id) {
        return Some(see_other(environment_selection_path(run.run.id), Vec::new()));
    }
    None
}

/// List active runs open for testing.
#[utoipa::path(
    get,
    path = "/runtests",
    tag = "Run Tests",
    params(
        ("product_id" = Option<i64>, Query, description = "Only runs of this product"),
        ("product_version_id" = Option<i64>, Query, description = "Only runs of this product version"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u32>, Query, description = "Results per page (default 20, max 100)")
    ),
    responses(
        (status = 200, description = "Active runs", body = SelectRunResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn select_run(
    caller: Caller,
    pool: web::Data<DbPool>,
    query: web::Query<SelectRunQuery>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::Execute)?;
    let query = query.into_inner();
    let params = PaginationParams::new(query.page, query.limit);

    let (runs, total) = pool
        .list_active_runs(query.product_id, query.product_version_id, &params)
        .await?;

    Ok(HttpResponse::Ok().json(SelectRunResponse {
        runs: runs.into_iter().map(RunSummary::from).collect(),
        pagination: Pagination::from_params(&params, total),
    }))
}

/// Environment selection data for a run.
#[utoipa::path(
    get,
    path = "/runtests/{run_id}/environment",
    tag = "Run Tests",
    params(
        ("run_id" = i64, Path, description = "Run ID"),
        ("environment" = Option<String>, Query, description = "Preselected environment ID")
    ),
    responses(
        (status = 200, description = "Run environments", body = EnvironmentSelectionResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn get_environment(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    query: web::Query<EnvironmentQuery>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::Execute)?;
    let run = require_run(&pool, path.into_inner()).await?;

    let current = query
        .environment
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| run.supports_environment(*id));
    let environments = pool.get_environments_in(run.environments()).await?;

    Ok(HttpResponse::Ok().json(EnvironmentSelectionResponse {
        run: RunSummary::from(run.run),
        environments: environments
            .into_iter()
            .map(EnvironmentResponse::from)
            .collect(),
        current,
    }))
}

/// Select the environment to test a run in.
///
/// Redirects to the execution screen for the chosen environment. Scripted
/// requests get the selection data with `current` set instead.
#[utoipa::path(
    post,
    path = "/runtests/{run_id}/environment",
    tag = "Run Tests",
    params(
        ("run_id" = i64, Path, description = "Run ID")
    ),
    request_body(content = EnvironmentSelectionForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Selection data (scripted requests)", body = EnvironmentSelectionResponse),
        (status = 303, description = "Redirect to the execution screen", body = crate::models::execution::RedirectResponse),
        (status = 400, description = "Not one of the run's environments", body = crate::error::ErrorResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn set_environment(
    req: HttpRequest,
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    form: web::Form<EnvironmentSelectionForm>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::Execute)?;
    let run = require_run(&pool, path.into_inner()).await?;

    let env_id = form
        .environment
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| run.supports_environment(*id))
        .ok_or_else(|| {
            AppError::field(
                "environment",
                "Select a valid choice. That choice is not one of the available choices.",
            )
        })?;

    if is_ajax(&req) {
        let environments = pool.get_environments_in(run.environments()).await?;
        return Ok(HttpResponse::Ok().json(EnvironmentSelectionResponse {
            run: RunSummary::from(run.run),
            environments: environments
                .into_iter()
                .map(EnvironmentResponse::from)
                .collect(),
            current: Some(env_id),
        }));
    }

    Ok(see_other(execution_path(run.run.id, env_id), Vec::new()))
}

/// Execution screen: the run's case versions with the caller's results in
/// the selected environment.
#[utoipa::path(
    get,
    path = "/runtests/{run_id}/env/{env_id}",
    tag = "Run Tests",
    params(
        ("run_id" = i64, Path, description = "Run ID"),
        ("env_id" = i64, Path, description = "Environment ID")
    ),
    responses(
        (status = 200, description = "Execution screen", body = RunExecutionResponse),
        (status = 303, description = "Run not open, or environment not valid for the run", body = crate::models::execution::RedirectResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn get_run(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<(i64, i64)>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::Execute)?;
    let (run_id, env_id) = path.into_inner();
    let run = require_run(&pool, run_id).await?;
    if let Some(redirect) = execution_redirect(&run, env_id) {
        return Ok(redirect);
    }

    let product_version = pool
        .get_product_version(run.run.product_version_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Product version {}", run.run.product_version_id))
        })?;
    let environments = pool.get_environments_in(run.environments()).await?;
    let environment = environments
        .iter()
        .find(|e| e.id == env_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Environment {}", env_id)))?;

    let rcvs = pool.get_run_case_versions(run_id).await?;
    let rows = services::load_execution_rows(&pool, rcvs, caller.user_id(), env_id).await?;

    Ok(HttpResponse::Ok().json(RunExecutionResponse {
        run: RunSummary::from(run.run),
        product_version: ProductVersionSummary::from(product_version),
        environment: EnvironmentResponse::from(environment),
        environments: environments
            .into_iter()
            .map(EnvironmentResponse::from)
            .collect(),
        rows,
    }))
}

/// Apply one result action.
///
/// The form carries one `action-<name>=<run case version id>` field (the
/// reverse `action-<id>=<name>` is accepted too) plus the optional
/// `stepnumber`, `comment` and `bug` fields. Scripted requests
/// (`X-Requested-With: XMLHttpRequest`) get the updated row back; others are
/// redirected to the execution screen.
#[utoipa::path(
    post,
    path = "/runtests/{run_id}/env/{env_id}",
    tag = "Run Tests",
    params(
        ("run_id" = i64, Path, description = "Run ID"),
        ("env_id" = i64, Path, description = "Environment ID")
    ),
    responses(
        (status = 200, description = "Updated row (scripted requests)", body = ExecutionFragment),
        (status = 303, description = "Redirect back to the execution screen", body = crate::models::execution::RedirectResponse),
        (status = 403, description = "Caller cannot record results", body = crate::error::ErrorResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn post_action(
    req: HttpRequest,
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<(i64, i64)>,
    form: web::Form<HashMap<String, String>>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::Execute)?;
    let tester_id = caller.tester_id()?;
    let (run_id, env_id) = path.into_inner();
    let run = require_run(&pool, run_id).await?;
    if let Some(redirect) = execution_redirect(&run, env_id) {
        return Ok(redirect);
    }

    let ExecutionOutcome {
        run_case_version,
        messages,
    } = services::apply_action(&pool, run_id, env_id, tester_id, &form).await?;

    if !is_ajax(&req) {
        return Ok(see_other(full_path(&req), messages));
    }

    let fragment = match run_case_version {
        Some(rcv) => ExecutionFragment {
            no_replace: false,
            row: services::load_execution_rows(&pool, vec![rcv], Some(tester_id), env_id)
                .await?
                .pop(),
            messages,
        },
        None => ExecutionFragment {
            no_replace: true,
            row: None,
            messages,
        },
    };
    Ok(HttpResponse::Ok().json(fragment))
}

/// Configure test execution routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/runtests").route(web::get().to(select_run)))
        .service(
            web::resource("/runtests/{run_id}/environment")
                .route(web::get().to(get_environment))
                .route(web::post().to(set_environment)),
        )
        .service(
            web::resource("/runtests/{run_id}/env/{env_id}")
                .route(web::get().to(get_run))
                .route(web::post().to(post_action)),
        );
}
