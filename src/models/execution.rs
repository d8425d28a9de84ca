//! DTOs for run selection, environment selection, test execution and
//! run case version browsing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::environment::{EnvironmentResponse, EnvironmentSet};
use super::library::CaseStepResponse;
use super::result::ResultResponse;
use super::run::{RunStatus, RunSummary};
use super::{Pagination, SortDirection};
use crate::entity::{case_version, product_version, run_case_version};

/// Form field prefix that marks the action of an execution POST.
pub const ACTION_PREFIX: &str = "action-";

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Error,
}

/// A message shown to the user after a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl UserMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}

/// Body of a redirect response: where to go next and what to tell the user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RedirectResponse {
    pub redirect: String,
    pub messages: Vec<UserMessage>,
}

/// The action field of an execution form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionField {
    pub name: String,
    /// The run case version id, or the raw text when it is not an integer.
    pub run_case_version_id: Result<i64, String>,
}

/// Find the action field in a submitted execution form.
///
/// Both `action-<name>=<id>` and `action-<id>=<name>` are accepted: whichever
/// side parses as an integer is the id. With several action fields the one
/// with the lowest key wins, so a request applies at most one action.
pub fn find_action_field(form: &HashMap<String, String>) -> Option<ActionField> {
    let (key, value) = form
        .iter()
        .filter(|(k, _)| k.starts_with(ACTION_PREFIX))
        .min_by(|a, b| a.0.cmp(b.0))?;
    let suffix = &key[ACTION_PREFIX.len()..];

    if let Ok(id) = suffix.trim().parse::<i64>() {
        return Some(ActionField {
            name: value.trim().to_string(),
            run_case_version_id: Ok(id),
        });
    }

    Some(ActionField {
        name: suffix.to_string(),
        run_case_version_id: value.trim().parse::<i64>().map_err(|_| value.clone()),
    })
}

/// Query for the environment selection screen.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EnvironmentQuery {
    /// Preselected environment; ignored unless it belongs to the run.
    pub environment: Option<String>,
}

/// Submitted environment selection form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnvironmentSelectionForm {
    pub environment: String,
}

/// Environment selection screen data.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnvironmentSelectionResponse {
    pub run: RunSummary,
    pub environments: Vec<EnvironmentResponse>,
    pub current: Option<i64>,
}

/// Product version as shown with a run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductVersionSummary {
    pub id: i64,
    pub product_id: i64,
    pub version: String,
}

impl From<product_version::Model> for ProductVersionSummary {
    fn from(m: product_version::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            version: m.version,
        }
    }
}

/// A case version included in a run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunCaseVersionResponse {
    pub id: i64,
    pub run_id: i64,
    pub case_version_id: i64,
    pub case_id: i64,
    pub name: String,
    pub order: i32,
    pub environment_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl RunCaseVersionResponse {
    pub fn new(
        rcv: run_case_version::Model,
        case_version: &case_version::Model,
        environments: &EnvironmentSet,
    ) -> Self {
        Self {
            id: rcv.id,
            run_id: rcv.run_id,
            case_version_id: rcv.case_version_id,
            case_id: case_version.case_id,
            name: case_version.name.clone(),
            order: rcv.order,
            environment_ids: environments.to_vec(),
            created_at: rcv.created_at,
        }
    }
}

/// One row of the test execution screen.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecutionRow {
    pub run_case_version: RunCaseVersionResponse,
    pub steps: Vec<CaseStepResponse>,
    /// The caller's result in the selected environment, if started.
    pub result: Option<ResultResponse>,
}

/// Test execution screen data.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunExecutionResponse {
    pub run: RunSummary,
    pub product_version: ProductVersionSummary,
    pub environment: EnvironmentResponse,
    pub environments: Vec<EnvironmentResponse>,
    pub rows: Vec<ExecutionRow>,
}

/// Fragment returned for an AJAX execution POST.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecutionFragment {
    /// `true` when no row was identified and the client should keep its markup.
    pub no_replace: bool,
    pub row: Option<ExecutionRow>,
    pub messages: Vec<UserMessage>,
}

/// Query for the run selection screen.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SelectRunQuery {
    pub product_id: Option<i64>,
    pub product_version_id: Option<i64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Sortable run case version columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunCaseVersionSortField {
    #[default]
    Order,
    Name,
    CreatedAt,
    RunId,
}

/// Query parameters for browsing run case versions.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListRunCaseVersionsQuery {
    pub run_id: Option<i64>,
    pub product_version_id: Option<i64>,
    pub case_version_id: Option<i64>,
    pub run_status: Option<RunStatus>,
    /// Case-insensitive substring match on the case version name.
    pub name: Option<String>,
    pub sortfield: Option<RunCaseVersionSortField>,
    pub sortdirection: Option<SortDirection>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Paginated run case version list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunCaseVersionListResponse {
    pub run_case_versions: Vec<RunCaseVersionResponse>,
    pub pagination: Pagination,
}

/// Run case version with all recorded results.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunCaseVersionDetailResponse {
    #[serde(flatten)]
    pub run_case_version: RunCaseVersionResponse,
    pub results: Vec<ResultResponse>,
    pub bug_urls: Vec<String>,
}

/// Paginated list of runs open for testing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SelectRunResponse {
    pub runs: Vec<RunSummary>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_action_name_in_key() {
        let field = find_action_field(&form(&[("action-start", "12"), ("comment", "")])).unwrap();
        assert_eq!(field.name, "start");
        assert_eq!(field.run_case_version_id, Ok(12));
    }

    #[test]
    fn test_id_in_key() {
        let field = find_action_field(&form(&[("action-12", "finishsucceed")])).unwrap();
        assert_eq!(field.name, "finishsucceed");
        assert_eq!(field.run_case_version_id, Ok(12));
    }

    #[test]
    fn test_non_numeric_id_is_kept_for_the_message() {
        let field = find_action_field(&form(&[("action-start", "abc")])).unwrap();
        assert_eq!(field.run_case_version_id, Err("abc".to_string()));
    }

    #[test]
    fn test_no_action_field() {
        assert_eq!(find_action_field(&form(&[("comment", "x")])), None);
    }

    #[test]
    fn test_lowest_key_wins() {
        let field =
            find_action_field(&form(&[("action-start", "3"), ("action-restart", "4")])).unwrap();
        assert_eq!(field.name, "restart");
        assert_eq!(field.run_case_version_id, Ok(4));
    }
}
