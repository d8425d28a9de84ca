//! User management endpoints.

use actix_web::{HttpResponse, get, post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::Caller;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::user::{CreateUserRequest, CreateUserResponse, UserResponse};
use crate::models::{Permission, Role};
use crate::services::user_keys;

/// Response after revoking a user's key.
#[derive(Serialize, ToSchema)]
pub struct RevokeUserResponse {
    pub message: String,
    pub id: i64,
}

/// Configure user management routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_user)
        .service(list_users)
        .service(revoke_user);
}

/// Create a user. The user's key is returned only in this response.
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Invalid username or role", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []), ("admin_key" = []))
)]
#[post("/users")]
pub async fn create_user(
    caller: Caller,
    body: web::Json<CreateUserRequest>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageUsers)?;

    let role = match body.role.as_deref() {
        None => Role::default(),
        Some(r) => Role::parse(r).ok_or_else(|| {
            AppError::field(
                "role",
                format!("Select a valid choice. {} is not one of the available choices.", r),
            )
        })?,
    };

    let (user, key) = user_keys::create_user(pool.get_ref(), &body.username, role).await?;

    Ok(HttpResponse::Created().json(CreateUserResponse {
        id: user.id,
        username: user.username,
        role,
        key,
        created_at: user.created_at,
    }))
}

/// List users, including revoked ones.
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "Users", body = Vec<UserResponse>),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []), ("admin_key" = []))
)]
#[get("/users")]
pub async fn list_users(caller: Caller, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageUsers)?;
    let users = pool.list_users().await?;
    Ok(HttpResponse::Ok().json(
        users
            .into_iter()
            .map(UserResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Revoke a user's key.
#[utoipa::path(
    post,
    path = "/users/{id}/revoke",
    tag = "Users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User revoked", body = RevokeUserResponse),
        (status = 404, description = "User not found or already revoked", body = crate::error::ErrorResponse),
    ),
    security(("api_key" = []), ("admin_key" = []))
)]
#[post("/users/{id}/revoke")]
pub async fn revoke_user(
    caller: Caller,
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    caller.require(Permission::ManageUsers)?;
    let id = path.into_inner();

    if caller.user_id() == Some(id) {
        return Err(AppError::InvalidInput(
            "Cannot revoke your own key".to_string(),
        ));
    }

    if pool.revoke_user(id).await? {
        tracing::info!(user_id = id, revoked_by = %caller.0.username, "Revoked user");
        Ok(HttpResponse::Ok().json(RevokeUserResponse {
            message: "User revoked".to_string(),
            id,
        }))
    } else {
        Err(AppError::NotFound(format!(
            "User {} not found or already revoked",
            id
        )))
    }
}
