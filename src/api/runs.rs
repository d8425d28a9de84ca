//! Run management endpoints.

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::auth::Caller;
use crate::db::DbPool;
use crate::entity::run;
use crate::error::AppResult;
use crate::models::run::{
    CreateRunRequest, ListRunsQuery, ReplaceRunEnvironmentsRequest, ReplaceRunSuitesRequest,
    RunDetailResponse, RunListResponse, RunSuiteResponse, RunSummary, UpdateRunRequest,
};
use crate::models::{
    EnvironmentSet, Pagination, PaginationParams, Permission, RunStatus, RunWithEnvironments,
};
use crate::services;

async fn run_detail(
    pool: &DbPool,
    run: run::Model,
    environments: &EnvironmentSet,
) -> AppResult<RunDetailResponse> {
    let suites = pool.get_run_suites(run.id).await?;
    let case_version_count = pool.count_run_case_versions(run.id).await?;

    Ok(RunDetailResponse {
        description: run.description.clone(),
        updated_at: run.updated_at,
        summary: RunSummary::from(run),
        environment_ids: environments.to_vec(),
        suites: suites.into_iter().map(RunSuiteResponse::from).collect(),
        case_version_count,
    })
}

async fn detail_for(pool: &DbPool, run: run::Model) -> AppResult<RunDetailResponse> {
    let environments = pool.get_run_environments(run.id).await?;
    run_detail(pool, run, &environments).await
}

/// Create a draft run.
#[utoipa::path(
    post,
    path = "/runs",
    tag = "Runs",
    request_body = CreateRunRequest,
    responses(
        (status = 201, description = "Run created", body = RunDetailResponse),
        (status = 400, description = "Invalid run", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn create_run(
    caller: Caller,
    pool: web::Data<DbPool>,
    body: web::Json<CreateRunRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageRuns)?;

    let RunWithEnvironments { run, environments } = pool.insert_run(&body).await?;
    info!(
        run_id = run.id,
        name = %run.name,
        created_by = %caller.0.username,
        "Run created"
    );

    let detail = run_detail(&pool, run, &environments).await?;
    Ok(HttpResponse::Created().json(detail))
}

/// List runs.
#[utoipa::path(
    get,
    path = "/runs",
    tag = "Runs",
    params(
        ("status" = Option<String>, Query, description = "draft, active or disabled"),
        ("product_version_id" = Option<i64>, Query, description = "Only runs of this product version"),
        ("name" = Option<String>, Query, description = "Case-insensitive name substring"),
        ("sortfield" = Option<String>, Query, description = "name, start_date, created_at or status"),
        ("sortdirection" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u32>, Query, description = "Results per page (default 20, max 100)")
    ),
    responses(
        (status = 200, description = "Runs", body = RunListResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn list_runs(
    _caller: Caller,
    pool: web::Data<DbPool>,
    query: web::Query<ListRunsQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let params = PaginationParams::new(query.page, query.limit);
    let (runs, total) = pool.list_runs(&query).await?;

    Ok(HttpResponse::Ok().json(RunListResponse {
        runs: runs.into_iter().map(RunSummary::from).collect(),
        pagination: Pagination::from_params(&params, total),
    }))
}

/// Get a run.
#[utoipa::path(
    get,
    path = "/runs/{id}",
    tag = "Runs",
    params(("id" = i64, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run", body = RunDetailResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn get_run(
    _caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let run = pool.require_run(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail_for(&pool, run).await?))
}

/// Edit a run's name, description or dates.
#[utoipa::path(
    put,
    path = "/runs/{id}",
    tag = "Runs",
    params(("id" = i64, Path, description = "Run ID")),
    request_body = UpdateRunRequest,
    responses(
        (status = 200, description = "Run updated", body = RunDetailResponse),
        (status = 400, description = "Invalid run", body = crate::error::ErrorResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn update_run(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<UpdateRunRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageRuns)?;
    let run = pool.update_run(path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(detail_for(&pool, run).await?))
}

/// Soft-delete a run.
#[utoipa::path(
    delete,
    path = "/runs/{id}",
    tag = "Runs",
    params(("id" = i64, Path, description = "Run ID")),
    responses(
        (status = 204, description = "Run deleted"),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn delete_run(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageRuns)?;
    let id = path.into_inner();
    pool.delete_run(id).await?;
    info!(run_id = id, deleted_by = %caller.0.username, "Run deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Activate a run, locking its case versions if it is still a draft.
#[utoipa::path(
    post,
    path = "/runs/{id}/activate",
    tag = "Runs",
    params(("id" = i64, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run activated", body = RunDetailResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn activate_run(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageRuns)?;
    let run = services::activate_run(&pool, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail_for(&pool, run).await?))
}

/// Close a run for testing.
#[utoipa::path(
    post,
    path = "/runs/{id}/deactivate",
    tag = "Runs",
    params(("id" = i64, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run disabled", body = RunDetailResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn deactivate_run(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageRuns)?;
    let run = pool
        .update_run_status(path.into_inner(), RunStatus::Disabled)
        .await?;
    info!(run_id = run.id, "Run deactivated");
    Ok(HttpResponse::Ok().json(detail_for(&pool, run).await?))
}

/// Copy a run into a new draft run.
#[utoipa::path(
    post,
    path = "/runs/{id}/clone",
    tag = "Runs",
    params(("id" = i64, Path, description = "Run ID")),
    responses(
        (status = 201, description = "Run cloned", body = RunDetailResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn clone_run(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageRuns)?;
    let RunWithEnvironments { run, environments } = pool.clone_run(path.into_inner()).await?;
    let detail = run_detail(&pool, run, &environments).await?;
    Ok(HttpResponse::Created().json(detail))
}

/// Replace the suites of a draft run.
#[utoipa::path(
    put,
    path = "/runs/{id}/suites",
    tag = "Runs",
    params(("id" = i64, Path, description = "Run ID")),
    request_body = ReplaceRunSuitesRequest,
    responses(
        (status = 200, description = "Suites replaced", body = RunDetailResponse),
        (status = 400, description = "Suite not in the run's product", body = crate::error::ErrorResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Run is not a draft", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn replace_suites(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<ReplaceRunSuitesRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageRuns)?;
    let id = path.into_inner();
    pool.replace_run_suites(id, &body.suite_ids).await?;
    let run = pool.require_run(id).await?;
    Ok(HttpResponse::Ok().json(detail_for(&pool, run).await?))
}

/// Replace the environments of a run.
#[utoipa::path(
    put,
    path = "/runs/{id}/environments",
    tag = "Runs",
    params(("id" = i64, Path, description = "Run ID")),
    request_body = ReplaceRunEnvironmentsRequest,
    responses(
        (status = 200, description = "Environments replaced", body = RunDetailResponse),
        (status = 400, description = "Unknown environment", body = crate::error::ErrorResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn replace_environments(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<ReplaceRunEnvironmentsRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageRuns)?;
    let RunWithEnvironments { run, environments } = pool
        .replace_run_environments(path.into_inner(), &body.environment_ids)
        .await?;
    let detail = run_detail(&pool, run, &environments).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Configure run management routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/runs")
            .route(web::get().to(list_runs))
            .route(web::post().to(create_run)),
    )
    .service(
        web::resource("/runs/{id}")
            .route(web::get().to(get_run))
            .route(web::put().to(update_run))
            .route(web::delete().to(delete_run)),
    )
    .service(web::resource("/runs/{id}/activate").route(web::post().to(activate_run)))
    .service(web::resource("/runs/{id}/deactivate").route(web::post().to(deactivate_run)))
    .service(web::resource("/runs/{id}/clone").route(web::post().to(clone_run)))
    .service(web::resource("/runs/{id}/suites").route(web::put().to(replace_suites)))
    .service(
        web::resource("/runs/{id}/environments").route(web::put().to(replace_environments)),
    );
}
