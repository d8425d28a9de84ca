//! Database queries for users.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entity::user::{self, ActiveModel, Entity as User};
use crate::error::{AppError, AppResult};
use crate::models::Role;

use super::{DbPool, is_unique_violation};

impl DbPool {
    /// Insert a new user with an already hashed key.
    pub async fn insert_user(
        &self,
        username: &str,
        role: Role,
        key_hash: &str,
        key_prefix: &str,
    ) -> AppResult<user::Model> {
        let model = ActiveModel {
            username: Set(username.to_string()),
            key_hash: Set(key_hash.to_string()),
            key_prefix: Set(key_prefix.to_string()),
            role: Set(role.as_str().to_string()),
            created_at: Set(Utc::now()),
            deleted_at: Set(None),
            ..Default::default()
        };

        model.insert(self.connection()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::field("username", format!("User '{}' already exists.", username))
            } else {
                AppError::Database(format!("Failed to insert user: {}", e))
            }
        })
    }

    /// Find an active (not revoked) user by key hash.
    pub async fn find_user_by_key_hash(&self, key_hash: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::KeyHash.eq(key_hash))
            .filter(user::Column::DeletedAt.is_null())
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to look up user: {}", e)))
    }

    /// List all users, including revoked ones.
    pub async fn list_users(&self) -> AppResult<Vec<user::Model>> {
        User::find()
            .order_by_asc(user::Column::Username)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list users: {}", e)))
    }

    /// Revoke a user's key (soft delete). Returns `false` if already revoked.
    pub async fn revoke_user(&self, id: i64) -> AppResult<bool> {
        let existing = User::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get user: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?;

        if existing.deleted_at.is_some() {
            return Ok(false);
        }

        let mut active: ActiveModel = existing.into();
        active.deleted_at = Set(Some(Utc::now()));
        active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to revoke user: {}", e)))?;

        Ok(true)
    }
}
