//! Test library endpoints: products, versions, environments, cases and
//! suites. Create and list only.

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::auth::Caller;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::library::{
    AddSuiteCaseRequest, CaseVersionResponse, CaseVersionWithEnvironments, CreateCaseRequest,
    CreateCaseVersionRequest, CreateEnvironmentRequest, CreateProductRequest,
    CreateProductVersionRequest, CreateSuiteRequest, ProductFilterQuery, ProductResponse,
    ProductVersionResponse, SuiteResponse,
};
use crate::models::{EnvironmentResponse, Permission};

async fn case_version_responses(
    pool: &DbPool,
    versions: Vec<CaseVersionWithEnvironments>,
) -> AppResult<Vec<CaseVersionResponse>> {
    let ids: Vec<i64> = versions.iter().map(|v| v.case_version.id).collect();
    let mut steps = pool.get_case_steps(&ids).await?;
    Ok(versions
        .into_iter()
        .map(|v| {
            let s = steps.remove(&v.case_version.id).unwrap_or_default();
            CaseVersionResponse::new(v, s)
        })
        .collect())
}

async fn case_version_response(
    pool: &DbPool,
    version: CaseVersionWithEnvironments,
) -> AppResult<CaseVersionResponse> {
    let id = version.case_version.id;
    case_version_responses(pool, vec![version])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("Case version {}", id)))
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "Library",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn create_product(
    caller: Caller,
    pool: web::Data<DbPool>,
    body: web::Json<CreateProductRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageLibrary)?;
    let product = pool.insert_product(&body.name, &body.description).await?;
    info!(product_id = product.id, name = %product.name, "Product created");
    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

#[utoipa::path(
    get,
    path = "/products",
    tag = "Library",
    responses((status = 200, description = "Products", body = Vec<ProductResponse>)),
    security(("api_key" = []))
)]
pub async fn list_products(_caller: Caller, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let products = pool.list_products().await?;
    Ok(HttpResponse::Ok().json(
        products
            .into_iter()
            .map(ProductResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/products/{id}/versions",
    tag = "Library",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = CreateProductVersionRequest,
    responses(
        (status = 201, description = "Product version created", body = ProductVersionResponse),
        (status = 404, description = "Product not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn create_product_version(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<CreateProductVersionRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageLibrary)?;
    let version = pool
        .insert_product_version(path.into_inner(), &body.version, &body.codename)
        .await?;
    Ok(HttpResponse::Created().json(ProductVersionResponse::from(version)))
}

#[utoipa::path(
    get,
    path = "/products/{id}/versions",
    tag = "Library",
    params(("id" = i64, Path, description = "Product ID")),
    responses((status = 200, description = "Product versions", body = Vec<ProductVersionResponse>)),
    security(("api_key" = []))
)]
pub async fn list_product_versions(
    _caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let versions = pool.list_product_versions(Some(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(
        versions
            .into_iter()
            .map(ProductVersionResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/environments",
    tag = "Library",
    request_body = CreateEnvironmentRequest,
    responses(
        (status = 201, description = "Environment created", body = EnvironmentResponse),
        (status = 400, description = "Invalid or duplicate name", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn create_environment(
    caller: Caller,
    pool: web::Data<DbPool>,
    body: web::Json<CreateEnvironmentRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageLibrary)?;
    let environment = pool.insert_environment(&body.name).await?;
    Ok(HttpResponse::Created().json(EnvironmentResponse::from(environment)))
}

#[utoipa::path(
    get,
    path = "/environments",
    tag = "Library",
    responses((status = 200, description = "Environments", body = Vec<EnvironmentResponse>)),
    security(("api_key" = []))
)]
pub async fn list_environments(
    _caller: Caller,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let environments = pool.list_environments().await?;
    Ok(HttpResponse::Ok().json(
        environments
            .into_iter()
            .map(EnvironmentResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Create a case together with its first version.
#[utoipa::path(
    post,
    path = "/cases",
    tag = "Library",
    request_body = CreateCaseRequest,
    responses(
        (status = 201, description = "Case created; returns its first version", body = CaseVersionResponse),
        (status = 400, description = "Invalid case", body = crate::error::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn create_case(
    caller: Caller,
    pool: web::Data<DbPool>,
    body: web::Json<CreateCaseRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageLibrary)?;
    let (case, version) = pool.insert_case(body.product_id, &body.version).await?;
    info!(case_id = case.id, case_version_id = version.case_version.id, "Case created");
    Ok(HttpResponse::Created().json(case_version_response(&pool, version).await?))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/versions",
    tag = "Library",
    params(("id" = i64, Path, description = "Case ID")),
    request_body = CreateCaseVersionRequest,
    responses(
        (status = 201, description = "Case version created", body = CaseVersionResponse),
        (status = 400, description = "Invalid case version", body = crate::error::ErrorResponse),
        (status = 404, description = "Case not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn create_case_version(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<CreateCaseVersionRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageLibrary)?;
    let version = pool.insert_case_version(path.into_inner(), &body).await?;
    Ok(HttpResponse::Created().json(case_version_response(&pool, version).await?))
}

#[utoipa::path(
    get,
    path = "/cases/{id}/versions",
    tag = "Library",
    params(("id" = i64, Path, description = "Case ID")),
    responses((status = 200, description = "Case versions", body = Vec<CaseVersionResponse>)),
    security(("api_key" = []))
)]
pub async fn list_case_versions(
    _caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let versions = pool
        .list_case_versions(Some(path.into_inner()), None)
        .await?;
    Ok(HttpResponse::Ok().json(case_version_responses(&pool, versions).await?))
}

#[utoipa::path(
    get,
    path = "/caseversions/{id}",
    tag = "Library",
    params(("id" = i64, Path, description = "Case version ID")),
    responses(
        (status = 200, description = "Case version", body = CaseVersionResponse),
        (status = 404, description = "Case version not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn get_case_version(
    _caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let version = pool
        .get_case_version(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Case version {}", id)))?;
    Ok(HttpResponse::Ok().json(case_version_response(&pool, version).await?))
}

#[utoipa::path(
    post,
    path = "/suites",
    tag = "Library",
    request_body = CreateSuiteRequest,
    responses(
        (status = 201, description = "Suite created", body = SuiteResponse),
        (status = 400, description = "Invalid suite", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn create_suite(
    caller: Caller,
    pool: web::Data<DbPool>,
    body: web::Json<CreateSuiteRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageLibrary)?;
    let (suite, case_ids) = pool.insert_suite(&body).await?;
    info!(suite_id = suite.id, cases = case_ids.len(), "Suite created");
    Ok(HttpResponse::Created().json(SuiteResponse::new(suite, case_ids)))
}

#[utoipa::path(
    get,
    path = "/suites",
    tag = "Library",
    params(("product_id" = Option<i64>, Query, description = "Only suites of this product")),
    responses((status = 200, description = "Suites", body = Vec<SuiteResponse>)),
    security(("api_key" = []))
)]
pub async fn list_suites(
    _caller: Caller,
    pool: web::Data<DbPool>,
    query: web::Query<ProductFilterQuery>,
) -> AppResult<HttpResponse> {
    let suites = pool.list_suites(query.product_id).await?;
    Ok(HttpResponse::Ok().json(
        suites
            .into_iter()
            .map(|(suite, case_ids)| SuiteResponse::new(suite, case_ids))
            .collect::<Vec<_>>(),
    ))
}

/// Append a case to a suite.
#[utoipa::path(
    post,
    path = "/suites/{id}/cases",
    tag = "Library",
    params(("id" = i64, Path, description = "Suite ID")),
    request_body = AddSuiteCaseRequest,
    responses(
        (status = 200, description = "Case added", body = SuiteResponse),
        (status = 400, description = "Case belongs to another product", body = crate::error::ErrorResponse),
        (status = 404, description = "Suite or case not found", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []))
)]
pub async fn add_suite_case(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<AddSuiteCaseRequest>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageLibrary)?;
    let suite_id = path.into_inner();
    let case_ids = pool.add_case_to_suite(suite_id, body.case_id).await?;
    let suite = pool
        .get_suite(suite_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Suite {}", suite_id)))?;
    Ok(HttpResponse::Ok().json(SuiteResponse::new(suite, case_ids)))
}

/// Configure library routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/products")
            .route(web::get().to(list_products))
            .route(web::post().to(create_product)),
    )
    .service(
        web::resource("/products/{id}/versions")
            .route(web::get().to(list_product_versions))
            .route(web::post().to(create_product_version)),
    )
    .service(
        web::resource("/environments")
            .route(web::get().to(list_environments))
            .route(web::post().to(create_environment)),
    )
    .service(web::resource("/cases").route(web::post().to(create_case)))
    .service(
        web::resource("/cases/{id}/versions")
            .route(web::get().to(list_case_versions))
            .route(web::post().to(create_case_version)),
    )
    .service(web::resource("/caseversions/{id}").route(web::get().to(get_case_version)))
    .service(
        web::resource("/suites")
            .route(web::get().to(list_suites))
            .route(web::post().to(create_suite)),
    )
    .service(web::resource("/suites/{id}/cases").route(web::post().to(add_suite_case)));
}
