//! Users, roles and permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::user;

/// User role. Each role grants a fixed set of permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Tester,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Tester => "tester",
            Self::Viewer => "viewer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "tester" => Some(Self::Tester),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        match self {
            Self::Admin => true,
            Self::Manager => permission != Permission::ManageUsers,
            Self::Tester => permission == Permission::Execute,
            Self::Viewer => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capabilities checked by request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageRuns,
    Execute,
    ReviewResults,
    ManageLibrary,
    ManageUsers,
}

impl Permission {
    /// Capability string, as shown in permission errors.
    pub fn codename(&self) -> &'static str {
        match self {
            Self::ManageRuns => "execution.manage_runs",
            Self::Execute => "execution.execute",
            Self::ReviewResults => "execution.review_results",
            Self::ManageLibrary => "library.manage",
            Self::ManageUsers => "users.manage",
        }
    }
}

/// Information about the authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    /// `None` when authenticated with the bootstrap admin key.
    pub user_id: Option<i64>,
    pub username: String,
    pub role: Role,
}

impl AuthenticatedCaller {
    pub fn can(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }
}

/// Request body for creating a user.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    /// Defaults to `tester`.
    pub role: Option<String>,
}

/// Response when a user is created. The key is shown only once.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateUserResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub key: String,
    pub created_at: DateTime<Utc>,
}

/// User as listed by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub key_prefix: String,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            role: Role::parse(&m.role).unwrap_or(Role::Viewer),
            is_revoked: m.deleted_at.is_some(),
            username: m.username,
            key_prefix: m.key_prefix,
            created_at: m.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert!(Role::Admin.has_permission(Permission::ManageUsers));
        assert!(Role::Manager.has_permission(Permission::ReviewResults));
        assert!(!Role::Manager.has_permission(Permission::ManageUsers));
        assert!(Role::Tester.has_permission(Permission::Execute));
        assert!(!Role::Tester.has_permission(Permission::ManageRuns));
        assert!(!Role::Viewer.has_permission(Permission::Execute));
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("Manager"), Some(Role::Manager));
        assert_eq!(Role::parse("owner"), None);
    }
}
