//! User key service: key generation, verification and user management.

use sha2::{Digest, Sha256};

use crate::db::DbPool;
use crate::entity::user;
use crate::error::{AppError, AppResult};
use crate::models::{AuthenticatedCaller, Role};

/// User key prefix.
const KEY_PREFIX: &str = "ct_";
/// Length of the key prefix stored for identification.
const KEY_PREFIX_LENGTH: usize = 8;
const MAX_USERNAME_LENGTH: usize = 100;

/// Generate a new random key.
///
/// Returns the full key (to be shown once), its hash and its display prefix.
pub fn generate_key() -> (String, String, String) {
    let full_key = format!("{}{}", KEY_PREFIX, uuid::Uuid::new_v4().simple());
    let key_hash = hash_key(&full_key);
    let key_prefix = full_key.chars().take(KEY_PREFIX_LENGTH).collect::<String>();
    (full_key, key_hash, key_prefix)
}

/// Hash a key using SHA-256.
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

fn validate_username(username: &str) -> AppResult<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::field("username", "This field is required."));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AppError::field(
            "username",
            format!(
                "Ensure this value has at most {} characters.",
                MAX_USERNAME_LENGTH
            ),
        ));
    }
    Ok(username)
}

/// Create a user and return it with its key.
pub async fn create_user(
    pool: &DbPool,
    username: &str,
    role: Role,
) -> AppResult<(user::Model, String)> {
    let username = validate_username(username)?;
    let (full_key, key_hash, key_prefix) = generate_key();
    let user = pool
        .insert_user(username, role, &key_hash, &key_prefix)
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, role = %role, "Created user");
    Ok((user, full_key))
}

/// Verify a user key and return the authenticated caller.
pub async fn verify_key(pool: &DbPool, key: &str) -> AppResult<AuthenticatedCaller> {
    let user = pool
        .find_user_by_key_hash(&hash_key(key))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid API key".to_string()))?;

    let role = Role::parse(&user.role).ok_or_else(|| {
        tracing::warn!(user_id = user.id, role = %user.role, "User has unknown role");
        AppError::Unauthorized("Invalid API key".to_string())
    })?;

    Ok(AuthenticatedCaller {
        user_id: Some(user.id),
        username: user.username,
        role,
    })
}
