//! API endpoint modules.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};

use crate::models::execution::{RedirectResponse, UserMessage};

pub mod health;
pub mod library;
pub mod openapi;
pub mod results;
pub mod runs;
pub mod runtests;
pub mod users;

pub use health::configure_health_routes;
pub use library::configure_routes as configure_library_routes;
pub use openapi::ApiDoc;
pub use results::configure_routes as configure_result_routes;
pub use runs::configure_routes as configure_run_routes;
pub use runtests::configure_routes as configure_runtests_routes;
pub use users::configure_routes as configure_user_routes;

/// Prefix under which every API route is mounted.
pub const API_PREFIX: &str = "/api/v1";

/// Whether the request was sent by a script expecting a fragment.
pub fn is_ajax(req: &HttpRequest) -> bool {
    req.headers()
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// `303 See Other` to `location`, carrying any user messages in the body.
pub fn see_other(location: impl Into<String>, messages: Vec<UserMessage>) -> HttpResponse {
    let location = location.into();
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.clone()))
        .json(RedirectResponse {
            redirect: location,
            messages,
        })
}

/// Full path of the request, including its query string.
pub fn full_path(req: &HttpRequest) -> String {
    let uri = req.uri();
    match uri.path_and_query() {
        Some(pq) => pq.as_str().to_string(),
        None => uri.path().to_string(),
    }
}
