//! Test library DTOs: products, versions, environments, cases and suites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::environment::{EnvironmentSet, HasEnvironments};
use crate::entity::{case_step, case_version, product, product_version, suite};

/// Publication status shared by case versions and suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LibraryStatus {
    #[default]
    Draft,
    Active,
    Disabled,
}

impl LibraryStatus {
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

/// A case version together with the environments it applies to.
#[derive(Debug, Clone)]
pub struct CaseVersionWithEnvironments {
    pub case_version: case_version::Model,
    pub environments: EnvironmentSet,
}

impl HasEnvironments for CaseVersionWithEnvironments {
    fn environments(&self) -> &EnvironmentSet {
        &self.environments
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(m: product::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProductVersionRequest {
    pub version: String,
    #[serde(default)]
    pub codename: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductVersionResponse {
    pub id: i64,
    pub product_id: i64,
    pub version: String,
    pub codename: String,
    pub created_at: DateTime<Utc>,
}

impl From<product_version::Model> for ProductVersionResponse {
    fn from(m: product_version::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            version: m.version,
            codename: m.codename,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEnvironmentRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewCaseStep {
    pub instruction: String,
    #[serde(default)]
    pub expected: String,
}

/// Create a case version. Steps are numbered from 1 in the given order.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateCaseVersionRequest {
    pub product_version_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: LibraryStatus,
    #[serde(default)]
    pub environment_ids: Vec<i64>,
    #[serde(default)]
    pub steps: Vec<NewCaseStep>,
}

/// Create a case together with its first version.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateCaseRequest {
    pub product_id: i64,
    pub version: CreateCaseVersionRequest,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CaseStepResponse {
    pub id: i64,
    pub number: i32,
    pub instruction: String,
    pub expected: String,
}

impl From<case_step::Model> for CaseStepResponse {
    fn from(m: case_step::Model) -> Self {
        Self {
            id: m.id,
            number: m.number,
            instruction: m.instruction,
            expected: m.expected,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CaseVersionResponse {
    pub id: i64,
    pub case_id: i64,
    pub product_version_id: i64,
    pub name: String,
    pub description: String,
    pub status: LibraryStatus,
    pub environment_ids: Vec<i64>,
    pub steps: Vec<CaseStepResponse>,
    pub created_at: DateTime<Utc>,
}

impl CaseVersionResponse {
    pub fn new(
        cv: CaseVersionWithEnvironments,
        steps: Vec<case_step::Model>,
    ) -> Self {
        let m = cv.case_version;
        Self {
            id: m.id,
            case_id: m.case_id,
            product_version_id: m.product_version_id,
            status: LibraryStatus::parse(&m.status).unwrap_or_default(),
            name: m.name,
            description: m.description,
            environment_ids: cv.environments.to_vec(),
            steps: steps.into_iter().map(CaseStepResponse::from).collect(),
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSuiteRequest {
    pub product_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: LibraryStatus,
    /// Case ids in suite order.
    #[serde(default)]
    pub case_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SuiteResponse {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub description: String,
    pub status: LibraryStatus,
    pub case_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl SuiteResponse {
    pub fn new(m: suite::Model, case_ids: Vec<i64>) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            status: LibraryStatus::parse(&m.status).unwrap_or_default(),
            name: m.name,
            description: m.description,
            case_ids,
            created_at: m.created_at,
        }
    }
}

/// Add a case to the end of a suite.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddSuiteCaseRequest {
    pub case_id: i64,
}

/// Optional product filter for library lists.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductFilterQuery {
    pub product_id: Option<i64>,
}
