//! Case tracking server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::path::PathBuf;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::http::header::{self, HeaderName};
use actix_web::{App, HttpRequest, HttpServer, Result as ActixResult, web};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use casetrack_lib::api::{self, API_PREFIX, ApiDoc};
use casetrack_lib::auth::AdminKey;
use casetrack_lib::config::{ADMIN_KEY_HEADER, API_KEY_HEADER, Config};
use casetrack_lib::db::DbPool;
use casetrack_lib::middleware::RequestLogger;

/// SPA fallback handler - serves index.html for client-side routing.
async fn spa_fallback(req: HttpRequest) -> ActixResult<NamedFile> {
    let static_dir = req
        .app_data::<web::Data<PathBuf>>()
        .ok_or_else(|| actix_web::error::ErrorNotFound("Static dir not configured"))?;
    Ok(NamedFile::open(static_dir.join("index.html"))?)
}

fn key_headers() -> Vec<HeaderName> {
    vec![
        header::ACCEPT,
        header::CONTENT_TYPE,
        HeaderName::from_static("x-requested-with"),
        HeaderName::from_bytes(API_KEY_HEADER.as_bytes()).unwrap_or(header::AUTHORIZATION),
        HeaderName::from_bytes(ADMIN_KEY_HEADER.as_bytes()).unwrap_or(header::AUTHORIZATION),
    ]
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by container health checks)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if Config::from_env().is_ok() { 0 } else { 1 });
    }

    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Case Track Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
        info!("Using development defaults for DATABASE_URL and CT_ADMIN_KEY");
    }

    let pool = match DbPool::new(&config).await {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }
    info!("Database migrations complete");

    if config.admin_key.is_none() {
        info!("No admin key configured; bootstrap admin access is disabled");
    }

    let bind_address = config.bind_address();
    let admin_key = AdminKey::new(config.admin_key.clone());
    let static_dir = config.static_dir.clone();
    let is_development = config.is_development();

    if static_dir.is_some() {
        info!("Static file serving enabled from {:?}", static_dir);
    }

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };

    let server = HttpServer::new(move || {
        let cors = if is_development {
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(key_headers())
                .expose_headers(vec![header::LOCATION])
                .max_age(3600)
        } else {
            // Same-origin only
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(key_headers())
                .expose_headers(vec![header::LOCATION])
                .max_age(3600)
        };

        let mut app = App::new()
            // CORS must wrap last so it runs first
            .wrap(RequestLogger)
            .wrap(cors)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(admin_key.clone()))
            .service(
                web::scope(API_PREFIX)
                    .configure(api::configure_health_routes)
                    .configure(api::configure_library_routes)
                    .configure(api::configure_run_routes)
                    .configure(api::configure_runtests_routes)
                    .configure(api::configure_result_routes)
                    .configure(api::configure_user_routes),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            );

        if let Some(ref dir) = static_dir {
            app = app
                .app_data(web::Data::new(dir.clone()))
                .service(Files::new("/assets", dir.join("assets")).prefer_utf8(true))
                .service(Files::new("/favicon", dir.clone()).index_file("favicon.ico"))
                .default_service(web::route().to(spa_fallback));
        }

        app
    });

    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
