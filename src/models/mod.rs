//! Domain models for the case tracking server.

use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;

pub mod environment;
pub mod execution;
pub mod library;
pub mod result;
pub mod run;
pub mod user;

// Re-export commonly used types
pub use environment::{EnvironmentResponse, EnvironmentSet, HasEnvironments};
pub use library::{CaseVersionWithEnvironments, LibraryStatus};
pub use result::{
    ActionError, ActionKind, ResultAction, ResultStatus, ReviewStatus, StepResultStatus,
    TransitionError,
};
pub use run::{RunStatus, RunWithEnvironments};
pub use user::{AuthenticatedCaller, Permission, Role};

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// Maximum page size for any list endpoint.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PaginationParams {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self { page, limit }
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(default_page()).max(1)
    }

    /// Clamp limit to the allowed range.
    pub fn clamped_limit(&self) -> u32 {
        self.limit.unwrap_or(default_limit()).clamp(1, MAX_PAGE_SIZE)
    }

    /// Calculate the offset for database queries.
    pub fn offset(&self) -> u64 {
        (self.page() as u64 - 1) * self.clamped_limit() as u64
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Clone, serde::Serialize, ToSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    /// Create pagination metadata.
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(limit.max(1) as u64) as u32
        };

        Pagination {
            page,
            limit,
            total,
            total_pages,
        }
    }

    pub fn from_params(params: &PaginationParams, total: u64) -> Self {
        Self::new(params.page(), params.clamped_limit(), total)
    }
}

/// Sort direction for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl From<SortDirection> for sea_orm::Order {
    fn from(d: SortDirection) -> Self {
        match d {
            SortDirection::Asc => sea_orm::Order::Asc,
            SortDirection::Desc => sea_orm::Order::Desc,
        }
    }
}

/// Deserialize a field where `null` and "missing" mean different things.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offset_and_clamp() {
        let p = PaginationParams::new(Some(3), Some(10));
        assert_eq!(p.offset(), 20);

        let p = PaginationParams::new(Some(0), Some(1000));
        assert_eq!(p.page(), 1);
        assert_eq!(p.clamped_limit(), MAX_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 25).total_pages, 3);
    }
}
