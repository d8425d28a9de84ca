//! Database queries for the test library: products, product versions, cases,
//! case versions, steps and suites.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};

use crate::entity::{
    case, case_step, case_version, product, product_version, suite, suite_case,
};
use crate::error::{AppError, AppResult};
use crate::models::library::{
    CaseVersionWithEnvironments, CreateCaseVersionRequest, CreateSuiteRequest, LibraryStatus,
};

use super::DbPool;
use super::environments::{insert_case_version_environments, load_case_version_environments};

/// Suite memberships of a suite in suite order (ties by id).
pub(crate) async fn load_suite_cases<C: ConnectionTrait>(
    db: &C,
    suite_id: i64,
) -> Result<Vec<suite_case::Model>, DbErr> {
    suite_case::Entity::find()
        .filter(suite_case::Column::SuiteId.eq(suite_id))
        .order_by_asc(suite_case::Column::Order)
        .order_by_asc(suite_case::Column::Id)
        .all(db)
        .await
}

/// Active case versions of `case_ids` for a product version, lowest id first.
pub(crate) async fn load_active_case_versions<C: ConnectionTrait>(
    db: &C,
    case_ids: &[i64],
    product_version_id: i64,
) -> Result<Vec<case_version::Model>, DbErr> {
    if case_ids.is_empty() {
        return Ok(Vec::new());
    }
    case_version::Entity::find()
        .filter(case_version::Column::CaseId.is_in(case_ids.to_vec()))
        .filter(case_version::Column::ProductVersionId.eq(product_version_id))
        .filter(case_version::Column::Status.eq(LibraryStatus::Active.as_str()))
        .order_by_asc(case_version::Column::Id)
        .all(db)
        .await
}

impl DbPool {
    /// Insert a new product.
    pub async fn insert_product(&self, name: &str, description: &str) -> AppResult<product::Model> {
        if name.trim().is_empty() {
            return Err(AppError::field("name", "This field is required."));
        }

        let model = product::ActiveModel {
            name: Set(name.trim().to_string()),
            description: Set(description.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert product: {}", e)))
    }

    pub async fn list_products(&self) -> AppResult<Vec<product::Model>> {
        product::Entity::find()
            .order_by_asc(product::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list products: {}", e)))
    }

    pub async fn get_product(&self, id: i64) -> AppResult<Option<product::Model>> {
        product::Entity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get product: {}", e)))
    }

    /// Insert a new version of an existing product.
    pub async fn insert_product_version(
        &self,
        product_id: i64,
        version: &str,
        codename: &str,
    ) -> AppResult<product_version::Model> {
        if version.trim().is_empty() {
            return Err(AppError::field("version", "This field is required."));
        }
        self.get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;

        let model = product_version::ActiveModel {
            product_id: Set(product_id),
            version: Set(version.trim().to_string()),
            codename: Set(codename.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert product version: {}", e)))
    }

    pub async fn list_product_versions(
        &self,
        product_id: Option<i64>,
    ) -> AppResult<Vec<product_version::Model>> {
        let mut select = product_version::Entity::find();
        if let Some(product_id) = product_id {
            select = select.filter(product_version::Column::ProductId.eq(product_id));
        }

        select
            .order_by_asc(product_version::Column::ProductId)
            .order_by_asc(product_version::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list product versions: {}", e)))
    }

    pub async fn get_product_version(&self, id: i64) -> AppResult<Option<product_version::Model>> {
        product_version::Entity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get product version: {}", e)))
    }

    /// Create a case together with its first version.
    pub async fn insert_case(
        &self,
        product_id: i64,
        version: &CreateCaseVersionRequest,
    ) -> AppResult<(case::Model, CaseVersionWithEnvironments)> {
        self.get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;
        self.check_case_version_request(product_id, version).await?;

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let case = case::ActiveModel {
            product_id: Set(product_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert case: {}", e)))?;

        let cv = insert_case_version_rows(&txn, case.id, version)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert case version: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit case: {}", e)))?;

        Ok((case, cv))
    }

    /// Add a new version to an existing case.
    pub async fn insert_case_version(
        &self,
        case_id: i64,
        version: &CreateCaseVersionRequest,
    ) -> AppResult<CaseVersionWithEnvironments> {
        let case = case::Entity::find_by_id(case_id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get case: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Case {}", case_id)))?;
        self.check_case_version_request(case.product_id, version)
            .await?;

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let cv = insert_case_version_rows(&txn, case.id, version)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert case version: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit case version: {}", e)))?;

        Ok(cv)
    }

    async fn check_case_version_request(
        &self,
        product_id: i64,
        version: &CreateCaseVersionRequest,
    ) -> AppResult<()> {
        if version.name.trim().is_empty() {
            return Err(AppError::field("name", "This field is required."));
        }
        let pv = self
            .get_product_version(version.product_version_id)
            .await?
            .ok_or_else(|| {
                AppError::field(
                    "product_version_id",
                    format!("Product version {} does not exist.", version.product_version_id),
                )
            })?;
        if pv.product_id != product_id {
            return Err(AppError::field(
                "product_version_id",
                "Product version belongs to a different product.",
            ));
        }
        self.resolve_environment_ids("environment_ids", &version.environment_ids)
            .await?;
        Ok(())
    }

    /// Case versions with their environments, optionally for one case.
    pub async fn list_case_versions(
        &self,
        case_id: Option<i64>,
        product_version_id: Option<i64>,
    ) -> AppResult<Vec<CaseVersionWithEnvironments>> {
        let mut select = case_version::Entity::find();
        if let Some(case_id) = case_id {
            select = select.filter(case_version::Column::CaseId.eq(case_id));
        }
        if let Some(pv) = product_version_id {
            select = select.filter(case_version::Column::ProductVersionId.eq(pv));
        }

        let versions = select
            .order_by_asc(case_version::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list case versions: {}", e)))?;

        self.with_case_version_environments(versions).await
    }

    pub async fn get_case_version(
        &self,
        id: i64,
    ) -> AppResult<Option<CaseVersionWithEnvironments>> {
        let Some(cv) = case_version::Entity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get case version: {}", e)))?
        else {
            return Ok(None);
        };

        Ok(self
            .with_case_version_environments(vec![cv])
            .await?
            .into_iter()
            .next())
    }

    async fn with_case_version_environments(
        &self,
        versions: Vec<case_version::Model>,
    ) -> AppResult<Vec<CaseVersionWithEnvironments>> {
        let ids: Vec<i64> = versions.iter().map(|cv| cv.id).collect();
        let mut sets = load_case_version_environments(self.connection(), &ids)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get case version environments: {}", e)))?;

        Ok(versions
            .into_iter()
            .map(|cv| CaseVersionWithEnvironments {
                environments: sets.remove(&cv.id).unwrap_or_default(),
                case_version: cv,
            })
            .collect())
    }

    /// Case versions by id.
    pub async fn get_case_versions_by_ids(
        &self,
        ids: &[i64],
    ) -> AppResult<HashMap<i64, case_version::Model>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = case_version::Entity::find()
            .filter(case_version::Column::Id.is_in(ids.to_vec()))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get case versions: {}", e)))?;
        Ok(rows.into_iter().map(|cv| (cv.id, cv)).collect())
    }

    /// Steps of several case versions in step order, keyed by case version id.
    pub async fn get_case_steps(
        &self,
        case_version_ids: &[i64],
    ) -> AppResult<HashMap<i64, Vec<case_step::Model>>> {
        let mut steps: HashMap<i64, Vec<case_step::Model>> = HashMap::new();
        if case_version_ids.is_empty() {
            return Ok(steps);
        }

        let rows = case_step::Entity::find()
            .filter(case_step::Column::CaseVersionId.is_in(case_version_ids.to_vec()))
            .order_by_asc(case_step::Column::CaseVersionId)
            .order_by_asc(case_step::Column::Number)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get case steps: {}", e)))?;

        for step in rows {
            steps.entry(step.case_version_id).or_default().push(step);
        }
        Ok(steps)
    }

    /// Create a suite with its cases in the given order.
    pub async fn insert_suite(
        &self,
        request: &CreateSuiteRequest,
    ) -> AppResult<(suite::Model, Vec<i64>)> {
        if request.name.trim().is_empty() {
            return Err(AppError::field("name", "This field is required."));
        }
        self.get_product(request.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", request.product_id)))?;

        let cases = if request.case_ids.is_empty() {
            Vec::new()
        } else {
            case::Entity::find()
                .filter(case::Column::Id.is_in(request.case_ids.clone()))
                .all(self.connection())
                .await
                .map_err(|e| AppError::Database(format!("Failed to get cases: {}", e)))?
        };
        for case_id in &request.case_ids {
            match cases.iter().find(|c| c.id == *case_id) {
                None => {
                    return Err(AppError::field(
                        "case_ids",
                        format!("Case {} does not exist.", case_id),
                    ));
                }
                Some(c) if c.product_id != request.product_id => {
                    return Err(AppError::field(
                        "case_ids",
                        format!("Case {} belongs to a different product.", case_id),
                    ));
                }
                Some(_) => {}
            }
        }

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let suite = suite::ActiveModel {
            product_id: Set(request.product_id),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description.clone()),
            status: Set(request.status.as_str().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert suite: {}", e)))?;

        for (index, case_id) in request.case_ids.iter().enumerate() {
            suite_case::ActiveModel {
                suite_id: Set(suite.id),
                case_id: Set(*case_id),
                order: Set(index as i32 + 1),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to add case to suite: {}", e)))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit suite: {}", e)))?;

        Ok((suite, request.case_ids.clone()))
    }

    /// Suites with their case ids in suite order.
    pub async fn list_suites(
        &self,
        product_id: Option<i64>,
    ) -> AppResult<Vec<(suite::Model, Vec<i64>)>> {
        let mut select = suite::Entity::find();
        if let Some(product_id) = product_id {
            select = select.filter(suite::Column::ProductId.eq(product_id));
        }
        let suites = select
            .order_by_asc(suite::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list suites: {}", e)))?;

        let mut out = Vec::with_capacity(suites.len());
        for s in suites {
            let case_ids = load_suite_cases(self.connection(), s.id)
                .await
                .map_err(|e| AppError::Database(format!("Failed to get suite cases: {}", e)))?
                .into_iter()
                .map(|sc| sc.case_id)
                .collect();
            out.push((s, case_ids));
        }
        Ok(out)
    }

    /// Append a case to the end of a suite.
    pub async fn add_case_to_suite(&self, suite_id: i64, case_id: i64) -> AppResult<Vec<i64>> {
        let suite = suite::Entity::find_by_id(suite_id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get suite: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Suite {}", suite_id)))?;
        let case = case::Entity::find_by_id(case_id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get case: {}", e)))?
            .ok_or_else(|| AppError::field("case_id", format!("Case {} does not exist.", case_id)))?;
        if case.product_id != suite.product_id {
            return Err(AppError::field(
                "case_id",
                format!("Case {} belongs to a different product.", case_id),
            ));
        }

        let existing = load_suite_cases(self.connection(), suite_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get suite cases: {}", e)))?;
        let next_order = existing.iter().map(|sc| sc.order).max().unwrap_or(0) + 1;

        suite_case::ActiveModel {
            suite_id: Set(suite_id),
            case_id: Set(case_id),
            order: Set(next_order),
            ..Default::default()
        }
        .insert(self.connection())
        .await
        .map_err(|e| AppError::Database(format!("Failed to add case to suite: {}", e)))?;

        let mut case_ids: Vec<i64> = existing.into_iter().map(|sc| sc.case_id).collect();
        case_ids.push(case_id);
        Ok(case_ids)
    }

    pub async fn get_suite(&self, id: i64) -> AppResult<Option<suite::Model>> {
        suite::Entity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get suite: {}", e)))
    }
}

/// Insert a case version row with its environments and numbered steps.
async fn insert_case_version_rows<C: ConnectionTrait>(
    db: &C,
    case_id: i64,
    version: &CreateCaseVersionRequest,
) -> Result<CaseVersionWithEnvironments, DbErr> {
    let cv = case_version::ActiveModel {
        case_id: Set(case_id),
        product_version_id: Set(version.product_version_id),
        name: Set(version.name.trim().to_string()),
        description: Set(version.description.clone()),
        status: Set(version.status.as_str().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let environments = version.environment_ids.iter().copied().collect();
    insert_case_version_environments(db, cv.id, &environments).await?;

    for (index, step) in version.steps.iter().enumerate() {
        case_step::ActiveModel {
            case_version_id: Set(cv.id),
            number: Set(index as i32 + 1),
            instruction: Set(step.instruction.clone()),
            expected: Set(step.expected.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(CaseVersionWithEnvironments {
        case_version: cv,
        environments,
    })
}
