//! Result browsing and review endpoints.

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::auth::Caller;
use crate::db::DbPool;
use crate::entity::run_case_version;
use crate::error::{AppError, AppResult};
use crate::models::execution::{
    ListRunCaseVersionsQuery, RunCaseVersionDetailResponse, RunCaseVersionListResponse,
    RunCaseVersionResponse,
};
use crate::models::result::{
    ListResultsQuery, ResultListResponse, ResultResponse, collect_bug_urls,
};
use crate::models::{Pagination, PaginationParams, Permission};

async fn run_case_version_responses(
    pool: &DbPool,
    rcvs: Vec<run_case_version::Model>,
) -> AppResult<Vec<RunCaseVersionResponse>> {
    let rcv_ids: Vec<i64> = rcvs.iter().map(|r| r.id).collect();
    let cv_ids: Vec<i64> = rcvs.iter().map(|r| r.case_version_id).collect();
    let case_versions = pool.get_case_versions_by_ids(&cv_ids).await?;
    let mut snapshots = pool.get_run_case_version_environments(&rcv_ids).await?;

    let mut out = Vec::with_capacity(rcvs.len());
    for rcv in rcvs {
        let Some(cv) = case_versions.get(&rcv.case_version_id) else {
            continue;
        };
        let snapshot = snapshots.remove(&rcv.id).unwrap_or_default();
        out.push(RunCaseVersionResponse::new(rcv, cv, &snapshot));
    }
    Ok(out)
}

async fn result_responses(
    pool: &DbPool,
    results: Vec<crate::entity::test_result::Model>,
) -> AppResult<Vec<ResultResponse>> {
    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    let mut step_results = pool.get_step_results(&ids).await?;
    Ok(results
        .into_iter()
        .map(|r| {
            let steps = step_results.remove(&r.id).unwrap_or_default();
            ResultResponse::new(r, steps)
        })
        .collect())
}

/// List run case versions.
#[utoipa::path(
    get,
    path = "/runcaseversions",
    tag = "Results",
    params(
        ("run_id" = Option<i64>, Query, description = "Only this run"),
        ("product_version_id" = Option<i64>, Query, description = "Only runs of this product version"),
        ("case_version_id" = Option<i64>, Query, description = "Only this case version"),
        ("run_status" = Option<String>, Query, description = "draft, active or disabled"),
        ("name" = Option<String>, Query, description = "Case-insensitive case version name substring"),
        ("sortfield" = Option<String>, Query, description = "order, name, created_at or run_id"),
        ("sortdirection" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u32>, Query, description = "Results per page (default 20, max 100)")
    ),
    responses(
        (status = 200, description = "Run case versions", body = RunCaseVersionListResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn list_run_case_versions(
    _caller: Caller,
    pool: web::Data<DbPool>,
    query: web::Query<ListRunCaseVersionsQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let params = PaginationParams::new(query.page, query.limit);
    let (rcvs, total) = pool.list_run_case_versions(&query).await?;

    Ok(HttpResponse::Ok().json(RunCaseVersionListResponse {
        run_case_versions: run_case_version_responses(&pool, rcvs).await?,
        pagination: Pagination::from_params(&params, total),
    }))
}

/// Get a run case version with all of its results.
#[utoipa::path(
    get,
    path = "/runcaseversions/{id}",
    tag = "Results",
    params(("id" = i64, Path, description = "Run case version ID")),
    responses(
        (status = 200, description = "Run case version", body = RunCaseVersionDetailResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn get_run_case_version(
    _caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let rcv = pool
        .get_run_case_version(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Run case version {}", id)))?;

    let run_case_version = run_case_version_responses(&pool, vec![rcv])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("Run case version {}", id)))?;
    let results = pool.get_results_for_run_case_version(id).await?;
    let results = result_responses(&pool, results).await?;
    let bug_urls = collect_bug_urls(
        results
            .iter()
            .flat_map(|r| r.bug_urls.iter().map(String::as_str)),
    );

    Ok(HttpResponse::Ok().json(RunCaseVersionDetailResponse {
        run_case_version,
        results,
        bug_urls,
    }))
}

/// List results.
#[utoipa::path(
    get,
    path = "/results",
    tag = "Results",
    params(
        ("run_case_version_id" = Option<i64>, Query, description = "Only this run case version"),
        ("tester_id" = Option<i64>, Query, description = "Only this tester"),
        ("environment_id" = Option<i64>, Query, description = "Only this environment"),
        ("status" = Option<String>, Query, description = "assigned, started, passed, failed or invalidated"),
        ("review" = Option<String>, Query, description = "pending or reviewed"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u32>, Query, description = "Results per page (default 20, max 100)")
    ),
    responses(
        (status = 200, description = "Results", body = ResultListResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn list_results(
    _caller: Caller,
    pool: web::Data<DbPool>,
    query: web::Query<ListResultsQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let params = PaginationParams::new(query.page, query.limit);
    let (results, total) = pool.list_results(&query).await?;

    Ok(HttpResponse::Ok().json(ResultListResponse {
        results: result_responses(&pool, results).await?,
        pagination: Pagination::from_params(&params, total),
    }))
}

/// Mark a result reviewed.
#[utoipa::path(
    post,
    path = "/results/{id}/review",
    tag = "Results",
    params(("id" = i64, Path, description = "Result ID")),
    responses(
        (status = 200, description = "Result reviewed", body = ResultResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Result not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already reviewed", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn review_result(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ReviewResults)?;
    let result = pool
        .review_result(path.into_inner(), caller.user_id())
        .await?;
    info!(
        result_id = result.id,
        reviewer = %caller.0.username,
        "Result reviewed"
    );

    let response = result_responses(&pool, vec![result])
        .await?
        .pop()
        .ok_or_else(|| AppError::Database("Reviewed result vanished".to_string()))?;
    Ok(HttpResponse::Ok().json(response))
}

/// Configure result browsing routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/runcaseversions").route(web::get().to(list_run_case_versions)),
    )
    .service(web::resource("/runcaseversions/{id}").route(web::get().to(get_run_case_version)))
    .service(web::resource("/results").route(web::get().to(list_results)))
    .service(web::resource("/results/{id}/review").route(web::post().to(review_result)));
}
