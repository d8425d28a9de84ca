//! OpenAPI documentation configuration.

use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use crate::config::{ADMIN_KEY_HEADER, API_KEY_HEADER};
use crate::models::{execution, library, result, run, user};
use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Case Track Server",
        version = "0.1.0",
        description = "Test case management: libraries of versioned cases, test runs and result recording"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    ),
    paths(
        // Health
        api::health::health,
        api::health::ready,
        // Library
        api::library::create_product,
        api::library::list_products,
        api::library::create_product_version,
        api::library::list_product_versions,
        api::library::create_environment,
        api::library::list_environments,
        api::library::create_case,
        api::library::create_case_version,
        api::library::list_case_versions,
        api::library::get_case_version,
        api::library::create_suite,
        api::library::list_suites,
        api::library::add_suite_case,
        // Runs
        api::runs::create_run,
        api::runs::list_runs,
        api::runs::get_run,
        api::runs::update_run,
        api::runs::delete_run,
        api::runs::activate_run,
        api::runs::deactivate_run,
        api::runs::clone_run,
        api::runs::replace_suites,
        api::runs::replace_environments,
        // Run tests
        api::runtests::select_run,
        api::runtests::get_environment,
        api::runtests::set_environment,
        api::runtests::get_run,
        api::runtests::post_action,
        // Results
        api::results::list_run_case_versions,
        api::results::get_run_case_version,
        api::results::list_results,
        api::results::review_result,
        // Users
        api::users::create_user,
        api::users::list_users,
        api::users::revoke_user,
    ),
    components(
        schemas(
            error::ErrorResponse,
            error::FieldError,
            models::Pagination,
            api::health::HealthResponse,
            api::health::ReadyResponse,
            models::EnvironmentResponse,
            // Library
            models::LibraryStatus,
            library::CreateProductRequest,
            library::ProductResponse,
            library::CreateProductVersionRequest,
            library::ProductVersionResponse,
            library::CreateEnvironmentRequest,
            library::NewCaseStep,
            library::CreateCaseVersionRequest,
            library::CreateCaseRequest,
            library::CaseStepResponse,
            library::CaseVersionResponse,
            library::CreateSuiteRequest,
            library::AddSuiteCaseRequest,
            library::SuiteResponse,
            // Runs
            models::RunStatus,
            run::CreateRunRequest,
            run::UpdateRunRequest,
            run::ReplaceRunSuitesRequest,
            run::ReplaceRunEnvironmentsRequest,
            run::RunSuiteResponse,
            run::RunSummary,
            run::RunDetailResponse,
            run::RunListResponse,
            // Execution
            execution::MessageLevel,
            execution::UserMessage,
            execution::RedirectResponse,
            execution::EnvironmentSelectionForm,
            execution::EnvironmentSelectionResponse,
            execution::ProductVersionSummary,
            execution::RunCaseVersionResponse,
            execution::ExecutionRow,
            execution::RunExecutionResponse,
            execution::ExecutionFragment,
            execution::SelectRunResponse,
            execution::RunCaseVersionListResponse,
            execution::RunCaseVersionDetailResponse,
            // Results
            models::ResultStatus,
            models::ReviewStatus,
            models::StepResultStatus,
            result::StepResultResponse,
            result::ResultResponse,
            result::ResultListResponse,
            // Users
            models::Role,
            user::CreateUserRequest,
            user::CreateUserResponse,
            user::UserResponse,
            api::users::RevokeUserResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Library", description = "Products, environments, cases and suites"),
        (name = "Runs", description = "Test run management"),
        (name = "Run Tests", description = "Test execution"),
        (name = "Results", description = "Result browsing and review"),
        (name = "Users", description = "User and key management")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add the key security schemes.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_KEY_HEADER))),
            );
        }
    }
}
