//! HTTP server for the table-of-contents tree
//!
//! Exposes the section engine from `toc-core` as a JSON API. The router is
//! organized into endpoint modules merged in [`create_router`]:
//!
//! - `section_endpoints`: health, tree reads, rename, create, delete, move
//! - `import_endpoints`: template import from uploads or server paths
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin toc-server
//!
//! TOC_SERVER_PORT=9000 RUST_LOG=debug cargo run --bin toc-server
//! ```

use axum::{
    http::{header, Method},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use toc_core::{DatabaseService, SectionService};

pub mod config;
mod http_error;
mod import_endpoints;
mod section_endpoints;

pub use config::ServerConfig;
pub use http_error::HttpError;
pub use import_endpoints::ImportResponse;
pub use section_endpoints::{CreatedResponse, OkResponse};

/// Application state shared across all endpoints
///
/// The `write_lock` mutex serializes mutating handlers in-process so they
/// queue here instead of waiting on SQLite's busy timeout. Read handlers do
/// not take it.
#[derive(Clone)]
pub struct AppState {
    pub sections: Arc<SectionService>,
    pub config: Arc<ServerConfig>,
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(sections: SectionService, config: ServerConfig) -> Self {
        Self {
            sections: Arc::new(sections),
            config: Arc::new(config),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open the configured database and build the state around it
    pub async fn open(config: ServerConfig) -> anyhow::Result<Self> {
        let db = DatabaseService::new(config.database_path.clone()).await?;
        Ok(Self::new(SectionService::new(Arc::new(db)), config))
    }
}

/// Create the main application router with all endpoint modules
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(section_endpoints::routes(state.clone()))
        .merge(import_endpoints::routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// CORS for the configured frontend origins
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(config.cors_origins.clone())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Start the HTTP server on 127.0.0.1
///
/// # Errors
///
/// Returns error if the database cannot be opened or the server fails to
/// bind or start.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let port = config.port;
    tracing::info!("Database: {}", config.database_path.display());
    tracing::info!("Fallback template: {}", config.json_path.display());

    let state = AppState::open(config).await?;
    let app = create_router(state);

    let addr = format!("127.0.0.1:{}", port);
    tracing::info!("HTTP server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
