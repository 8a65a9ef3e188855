//! Report API - read-only HTTP view over the latest inference report
//!
//! The report file is re-read on every request, so a new `infer` run shows
//! up without restarting the server.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub report_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(report_path: impl Into<PathBuf>) -> Self {
        Self { report_path: Arc::new(report_path.into()) }
    }
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/summary", get(handlers::summary))
        .route("/results", get(handlers::results))
        .route("/host/:host_id", get(handlers::host))
        .route("/alerts", get(handlers::alerts))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Report API listening on http://{} (report: {})", addr, state.report_path.display());

    axum::serve(listener, create_router(state)).await
}
