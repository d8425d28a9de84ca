//! Actix-web extractor resolving the calling user.
//!
//! A request authenticates with `X-Admin-Key` (the bootstrap admin key) or
//! `X-API-Key` (a user's personal key). Header values are wrapped in
//! `SecretString` as soon as they are read.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use futures_util::future::LocalBoxFuture;
use secrecy::{ExposeSecret, SecretString};

use super::AdminKey;
use crate::config::{ADMIN_KEY_HEADER, API_KEY_HEADER};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{AuthenticatedCaller, Permission, Role};
use crate::services::user_keys;

fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| SecretString::from(s.to_string()))
}

/// The authenticated caller of a request.
///
/// ```ignore
/// async fn handler(caller: Caller) -> AppResult<HttpResponse> {
///     caller.require(Permission::ManageRuns)?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Caller(pub AuthenticatedCaller);

impl Caller {
    /// Fail with 403 unless the caller holds `permission`.
    pub fn require(&self, permission: Permission) -> AppResult<()> {
        if self.0.can(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Requires the {} permission",
                permission.codename()
            )))
        }
    }

    /// The caller's user id, for actions that are recorded against a tester.
    /// The bootstrap admin key has no user identity.
    pub fn tester_id(&self) -> AppResult<i64> {
        self.0.user_id.ok_or_else(|| {
            AppError::Forbidden("The admin key cannot record test results".to_string())
        })
    }

    pub fn user_id(&self) -> Option<i64> {
        self.0.user_id
    }
}

impl FromRequest for Caller {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let pool = req.app_data::<web::Data<DbPool>>().cloned();
        let admin_key = req.app_data::<web::Data<AdminKey>>().cloned();
        let provided_admin_key = extract_secret_header(req, ADMIN_KEY_HEADER);
        let provided_api_key = extract_secret_header(req, API_KEY_HEADER);

        Box::pin(async move {
            if let (Some(provided), Some(key)) = (&provided_admin_key, &admin_key) {
                if key.verify(provided.expose_secret()) {
                    return Ok(Caller(AuthenticatedCaller {
                        user_id: None,
                        username: "admin (bootstrap)".to_string(),
                        role: Role::Admin,
                    }));
                }
            }

            let Some(key) = provided_api_key else {
                let message = if provided_admin_key.is_some() {
                    "Invalid admin key"
                } else {
                    "Missing API key. Provide X-API-Key header."
                };
                return Err(AppError::Unauthorized(message.to_string()));
            };
            let pool = pool.ok_or_else(|| {
                AppError::Database("Database pool is not configured".to_string())
            })?;

            user_keys::verify_key(pool.get_ref(), key.expose_secret())
                .await
                .map(Caller)
        })
    }
}
