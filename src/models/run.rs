//! Run domain models and DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::environment::{EnvironmentSet, HasEnvironments};
use super::{Pagination, SortDirection};
use crate::entity::{run, run_suite};
use crate::error::FieldError;

/// Run status.
///
/// A run starts as a draft. Activating a draft locks its case versions;
/// disabled runs are closed for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Draft,
    Active,
    Disabled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check that a run's date window is well formed.
pub fn validate_dates(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), FieldError> {
    match end {
        Some(end) if start > end => Err(FieldError::new(
            "end_date",
            "Start date must be prior to end date.",
        )),
        _ => Ok(()),
    }
}

/// Validate the editable fields of a run, collecting every failure.
pub fn validate_run_fields(
    name: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "This field is required."));
    } else if name.chars().count() > 200 {
        errors.push(FieldError::new(
            "name",
            "Ensure this value has at most 200 characters.",
        ));
    }
    if let Err(e) = validate_dates(start, end) {
        errors.push(e);
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// A run together with its configured environments.
#[derive(Debug, Clone)]
pub struct RunWithEnvironments {
    pub run: run::Model,
    pub environments: EnvironmentSet,
}

impl RunWithEnvironments {
    pub fn status(&self) -> Option<RunStatus> {
        RunStatus::parse(&self.run.status)
    }

    pub fn is_active(&self) -> bool {
        self.status() == Some(RunStatus::Active)
    }
}

impl HasEnvironments for RunWithEnvironments {
    fn environments(&self) -> &EnvironmentSet {
        &self.environments
    }
}

/// Request body for creating a run.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRunRequest {
    pub product_version_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to today.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub environment_ids: Vec<i64>,
    /// Suite ids in inclusion order.
    #[serde(default)]
    pub suite_ids: Vec<i64>,
}

/// Request body for editing a run. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateRunRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    /// `null` clears the end date; omit the field to keep it.
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub end_date: Option<Option<NaiveDate>>,
}

/// Request body for replacing a run's suites.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReplaceRunSuitesRequest {
    /// Suite ids in inclusion order.
    pub suite_ids: Vec<i64>,
}

/// Request body for replacing a run's environments.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReplaceRunEnvironmentsRequest {
    pub environment_ids: Vec<i64>,
}

/// Suite included in a run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunSuiteResponse {
    pub id: i64,
    pub suite_id: i64,
    pub order: i32,
}

impl From<run_suite::Model> for RunSuiteResponse {
    fn from(m: run_suite::Model) -> Self {
        Self {
            id: m.id,
            suite_id: m.suite_id,
            order: m.order,
        }
    }
}

/// Run summary for lists.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunSummary {
    pub id: i64,
    pub product_version_id: i64,
    pub name: String,
    pub status: RunStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<run::Model> for RunSummary {
    fn from(m: run::Model) -> Self {
        Self {
            id: m.id,
            product_version_id: m.product_version_id,
            status: RunStatus::parse(&m.status).unwrap_or(RunStatus::Draft),
            name: m.name,
            start_date: m.start_date,
            end_date: m.end_date,
            created_at: m.created_at,
        }
    }
}

/// Full run detail.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunDetailResponse {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub description: String,
    pub environment_ids: Vec<i64>,
    pub suites: Vec<RunSuiteResponse>,
    pub case_version_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// Paginated run list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunListResponse {
    pub runs: Vec<RunSummary>,
    pub pagination: Pagination,
}

/// Sortable run columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunSortField {
    Name,
    StartDate,
    #[default]
    CreatedAt,
    Status,
}

/// Query parameters for listing runs.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListRunsQuery {
    pub status: Option<RunStatus>,
    pub product_version_id: Option<i64>,
    /// Case-insensitive substring match on the run name.
    pub name: Option<String>,
    pub sortfield: Option<RunSortField>,
    pub sortdirection: Option<SortDirection>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
