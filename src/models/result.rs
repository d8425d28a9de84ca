//! Result and step result models, and the result state machine.
//!
//! Testers drive a result through named actions. Each action name maps to one
//! [`ActionKind`] through a fixed table; [`ResultAction`] carries the action's
//! parameters and [`plan_transition`] decides what a given action does to a
//! result in a given state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{step_result, test_result};

use super::Pagination;

/// Result status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Assigned,
    Started,
    Passed,
    Failed,
    Invalidated,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Started => "started",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Invalidated => "invalidated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assigned" => Some(Self::Assigned),
            "started" => Some(Self::Started),
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "invalidated" => Some(Self::Invalidated),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Invalidated)
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review state of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Reviewed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "reviewed" => Some(Self::Reviewed),
            _ => None,
        }
    }
}

/// Step result status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepResultStatus {
    Passed,
    Failed,
    Invalidated,
}

impl StepResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Invalidated => "invalidated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "invalidated" => Some(Self::Invalidated),
            _ => None,
        }
    }
}

/// The named actions a tester can invoke on a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Start,
    FinishSucceed,
    FinishInvalidate,
    FinishFail,
    Restart,
}

/// Action names as they arrive from forms.
const ACTIONS: &[(&str, ActionKind)] = &[
    ("start", ActionKind::Start),
    ("finishsucceed", ActionKind::FinishSucceed),
    ("finishinvalidate", ActionKind::FinishInvalidate),
    ("finishfail", ActionKind::FinishFail),
    ("restart", ActionKind::Restart),
];

impl ActionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        ACTIONS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn name(&self) -> &'static str {
        ACTIONS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }

    /// States this action may be applied from.
    fn allowed_from(&self) -> &'static [ResultStatus] {
        match self {
            Self::Start => &[ResultStatus::Assigned],
            Self::FinishSucceed | Self::FinishInvalidate | Self::FinishFail => {
                &[ResultStatus::Started]
            }
            Self::Restart => &[
                ResultStatus::Passed,
                ResultStatus::Failed,
                ResultStatus::Invalidated,
            ],
        }
    }

    fn target(&self) -> ResultStatus {
        match self {
            Self::Start | Self::Restart => ResultStatus::Started,
            Self::FinishSucceed => ResultStatus::Passed,
            Self::FinishInvalidate => ResultStatus::Invalidated,
            Self::FinishFail => ResultStatus::Failed,
        }
    }
}

/// A parsed action with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultAction {
    Start,
    FinishSucceed,
    FinishInvalidate {
        comment: String,
    },
    FinishFail {
        step_number: Option<i32>,
        comment: String,
        bug_url: String,
    },
    Restart,
}

/// An action request that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("{0} is not a valid action.")]
    UnknownAction(String),
}

impl ResultAction {
    /// Build an action from its name and the submitted form parameters.
    ///
    /// Only the parameters the action accepts are read; missing ones take
    /// their defaults. A step number that is not an integer counts as absent.
    pub fn from_form(name: &str, params: &HashMap<String, String>) -> Result<Self, ActionError> {
        let kind =
            ActionKind::from_name(name).ok_or_else(|| ActionError::UnknownAction(name.to_string()))?;
        let text = |key: &str| params.get(key).cloned().unwrap_or_default();

        Ok(match kind {
            ActionKind::Start => Self::Start,
            ActionKind::FinishSucceed => Self::FinishSucceed,
            ActionKind::FinishInvalidate => Self::FinishInvalidate {
                comment: text("comment"),
            },
            ActionKind::FinishFail => Self::FinishFail {
                step_number: params
                    .get("stepnumber")
                    .and_then(|s| s.trim().parse::<i32>().ok()),
                comment: text("comment"),
                bug_url: text("bug").trim().to_string(),
            },
            ActionKind::Restart => Self::Restart,
        })
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Start => ActionKind::Start,
            Self::FinishSucceed => ActionKind::FinishSucceed,
            Self::FinishInvalidate { .. } => ActionKind::FinishInvalidate,
            Self::FinishFail { .. } => ActionKind::FinishFail,
            Self::Restart => ActionKind::Restart,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// An action that is not allowed from the result's current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Can't finish a result that was never started.")]
    NotStarted,
    #[error("This result has already been started.")]
    AlreadyStarted,
    #[error("This result is already finished; restart it first.")]
    AlreadyFinished,
    #[error("Only a finished result can be restarted.")]
    NotFinished,
    #[error("Result has an unrecognized status '{0}'.")]
    UnknownStatus(String),
    #[error("This result was just changed by another request. Reload and try again.")]
    Changed,
}

/// The field changes an action makes to a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub status: ResultStatus,
    /// `Some` resets the start time.
    pub started_at: Option<DateTime<Utc>>,
    /// `Some(None)` clears the completion time, `Some(Some(t))` sets it.
    pub completed_at: Option<Option<DateTime<Utc>>>,
    /// `Some` replaces the comment.
    pub comment: Option<String>,
    /// Step to mark failed, with its bug URL.
    pub failed_step: Option<FailedStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStep {
    pub step_number: i32,
    pub bug_url: String,
}

/// Decide what `action` does to a result currently in `current`.
pub fn plan_transition(
    current: ResultStatus,
    action: &ResultAction,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    let kind = action.kind();
    if !kind.allowed_from().contains(&current) {
        return Err(match kind {
            ActionKind::Start if current.is_terminal() => TransitionError::AlreadyFinished,
            ActionKind::Start => TransitionError::AlreadyStarted,
            ActionKind::Restart => TransitionError::NotFinished,
            _ if current == ResultStatus::Assigned => TransitionError::NotStarted,
            _ => TransitionError::AlreadyFinished,
        });
    }

    let mut transition = Transition {
        status: kind.target(),
        started_at: None,
        completed_at: None,
        comment: None,
        failed_step: None,
    };

    match action {
        ResultAction::Start | ResultAction::Restart => {
            transition.started_at = Some(now);
            transition.completed_at = Some(None);
        }
        ResultAction::FinishSucceed => {
            transition.completed_at = Some(Some(now));
        }
        ResultAction::FinishInvalidate { comment } => {
            transition.completed_at = Some(Some(now));
            transition.comment = Some(comment.clone());
        }
        ResultAction::FinishFail {
            step_number,
            comment,
            bug_url,
        } => {
            transition.completed_at = Some(Some(now));
            transition.comment = Some(comment.clone());
            transition.failed_step = step_number.map(|n| FailedStep {
                step_number: n,
                bug_url: bug_url.clone(),
            });
        }
    }

    Ok(transition)
}

/// Distinct non-empty bug URLs, sorted.
pub fn collect_bug_urls<'a>(urls: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = urls
        .into_iter()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Step result as exposed by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StepResultResponse {
    pub id: i64,
    pub step_id: i64,
    pub status: StepResultStatus,
    pub bug_url: String,
}

impl From<step_result::Model> for StepResultResponse {
    fn from(m: step_result::Model) -> Self {
        Self {
            id: m.id,
            step_id: m.step_id,
            status: StepResultStatus::parse(&m.status).unwrap_or(StepResultStatus::Passed),
            bug_url: m.bug_url,
        }
    }
}

/// Result as exposed by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResultResponse {
    pub id: i64,
    pub run_case_version_id: i64,
    pub tester_id: i64,
    pub environment_id: i64,
    pub status: ResultStatus,
    pub review: ReviewStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub comment: String,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<i64>,
    pub step_results: Vec<StepResultResponse>,
    pub bug_urls: Vec<String>,
}

impl ResultResponse {
    pub fn new(m: test_result::Model, steps: Vec<step_result::Model>) -> Self {
        let bug_urls = collect_bug_urls(steps.iter().map(|s| s.bug_url.as_str()));
        Self {
            id: m.id,
            run_case_version_id: m.run_case_version_id,
            tester_id: m.tester_id,
            environment_id: m.environment_id,
            status: ResultStatus::parse(&m.status).unwrap_or(ResultStatus::Assigned),
            review: ReviewStatus::parse(&m.review).unwrap_or(ReviewStatus::Pending),
            started_at: m.started_at,
            completed_at: m.completed_at,
            comment: m.comment,
            reviewed_at: m.reviewed_at,
            reviewed_by: m.reviewed_by,
            step_results: steps.into_iter().map(StepResultResponse::from).collect(),
            bug_urls,
        }
    }
}

/// Paginated result list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResultListResponse {
    pub results: Vec<ResultResponse>,
    pub pagination: Pagination,
}

/// Query parameters for listing results.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListResultsQuery {
    pub run_case_version_id: Option<i64>,
    pub tester_id: Option<i64>,
    pub environment_id: Option<i64>,
    pub status: Option<ResultStatus>,
    pub review: Option<ReviewStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2012-01-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_action_table_covers_every_kind() {
        for name in ["start", "finishsucceed", "finishinvalidate", "finishfail", "restart"] {
            let kind = ActionKind::from_name(name).unwrap();
            assert_eq!(kind.name(), name);
        }
    }

    #[test]
    fn test_unknown_action_is_rejected_with_message() {
        let err = ResultAction::from_form("delete", &HashMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "delete is not a valid action.");
        assert!(ResultAction::from_form("Start", &HashMap::new()).is_err());
    }

    #[test]
    fn test_finishfail_reads_its_parameters() {
        let action = ResultAction::from_form(
            "finishfail",
            &params(&[
                ("stepnumber", "2"),
                ("comment", "crashed"),
                ("bug", " http://bugs.example.com/1 "),
            ]),
        )
        .unwrap();

        assert_eq!(
            action,
            ResultAction::FinishFail {
                step_number: Some(2),
                comment: "crashed".to_string(),
                bug_url: "http://bugs.example.com/1".to_string(),
            }
        );
    }

    #[test]
    fn test_finishfail_defaults_and_bad_stepnumber() {
        let action =
            ResultAction::from_form("finishfail", &params(&[("stepnumber", "two")])).unwrap();
        assert_eq!(
            action,
            ResultAction::FinishFail {
                step_number: None,
                comment: String::new(),
                bug_url: String::new(),
            }
        );
    }

    #[test]
    fn test_irrelevant_parameters_are_ignored() {
        let action =
            ResultAction::from_form("finishsucceed", &params(&[("comment", "ignored")])).unwrap();
        assert_eq!(action, ResultAction::FinishSucceed);
    }

    #[test]
    fn test_start_then_succeed() {
        let started = plan_transition(ResultStatus::Assigned, &ResultAction::Start, now()).unwrap();
        assert_eq!(started.status, ResultStatus::Started);
        assert_eq!(started.started_at, Some(now()));
        assert_eq!(started.completed_at, Some(None));

        let passed =
            plan_transition(started.status, &ResultAction::FinishSucceed, now()).unwrap();
        assert_eq!(passed.status, ResultStatus::Passed);
        assert_eq!(passed.completed_at, Some(Some(now())));
        assert_eq!(passed.comment, None);
    }

    #[test]
    fn test_finish_invalidate_records_comment() {
        let t = plan_transition(
            ResultStatus::Started,
            &ResultAction::FinishInvalidate {
                comment: "env broken".into(),
            },
            now(),
        )
        .unwrap();
        assert_eq!(t.status, ResultStatus::Invalidated);
        assert_eq!(t.comment.as_deref(), Some("env broken"));
    }

    #[test]
    fn test_finish_fail_carries_failed_step() {
        let t = plan_transition(
            ResultStatus::Started,
            &ResultAction::FinishFail {
                step_number: Some(3),
                comment: "no".into(),
                bug_url: "http://b/3".into(),
            },
            now(),
        )
        .unwrap();
        assert_eq!(t.status, ResultStatus::Failed);
        assert_eq!(
            t.failed_step,
            Some(FailedStep {
                step_number: 3,
                bug_url: "http://b/3".into()
            })
        );
    }

    #[test]
    fn test_finishing_before_start_is_a_conflict() {
        for action in [
            ResultAction::FinishSucceed,
            ResultAction::FinishInvalidate { comment: "".into() },
        ] {
            assert_eq!(
                plan_transition(ResultStatus::Assigned, &action, now()),
                Err(TransitionError::NotStarted)
            );
        }
    }

    #[test]
    fn test_every_terminal_state_can_restart() {
        for status in [
            ResultStatus::Passed,
            ResultStatus::Failed,
            ResultStatus::Invalidated,
        ] {
            let t = plan_transition(status, &ResultAction::Restart, now()).unwrap();
            assert_eq!(t.status, ResultStatus::Started);
            assert_eq!(t.completed_at, Some(None));
        }
    }

    #[test]
    fn test_disallowed_transitions() {
        assert_eq!(
            plan_transition(ResultStatus::Started, &ResultAction::Start, now()),
            Err(TransitionError::AlreadyStarted)
        );
        assert_eq!(
            plan_transition(ResultStatus::Passed, &ResultAction::Start, now()),
            Err(TransitionError::AlreadyFinished)
        );
        assert_eq!(
            plan_transition(ResultStatus::Failed, &ResultAction::FinishSucceed, now()),
            Err(TransitionError::AlreadyFinished)
        );
        assert_eq!(
            plan_transition(ResultStatus::Started, &ResultAction::Restart, now()),
            Err(TransitionError::NotFinished)
        );
    }

    #[test]
    fn test_bug_urls_are_distinct_and_non_empty() {
        let urls = collect_bug_urls(["http://b/2", "", "http://b/1", "http://b/2", "  "]);
        assert_eq!(urls, vec!["http://b/1", "http://b/2"]);
    }
}
