//! Chartgate HTTP façade
//!
//! Endpoints:
//! - `PUT /repo`, `GET /repo`, `DELETE /repo` - manage the repository registry
//! - `POST /repo/update` - refresh every repository index
//! - `PUT /install` - install a chart (multipart `data` + optional `file`)
//! - `DELETE /uninstall` - uninstall a release
//! - `GET /health` - liveness check

pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router, middleware};
use chartgate_core::config::ServerConfig;
use chartgate_core::context::AppContext;
use chartgate_core::deploy::{DeploymentOrchestrator, StagingArea};
use chartgate_core::engine::DeploymentEngine;
use chartgate_core::engine::local::LocalEngine;
use chartgate_core::repo::RepositoryManager;

pub use error::ApiError;

/// Shared handler state.
pub struct AppState<E> {
    pub repositories: RepositoryManager,
    pub orchestrator: Arc<DeploymentOrchestrator<E>>,
    pub staging: StagingArea,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            repositories: self.repositories.clone(),
            orchestrator: Arc::clone(&self.orchestrator),
            staging: self.staging.clone(),
        }
    }
}

impl<E: DeploymentEngine> AppState<E> {
    pub fn new(
        repositories: RepositoryManager,
        orchestrator: DeploymentOrchestrator<E>,
        staging: StagingArea,
    ) -> Self {
        Self {
            repositories,
            orchestrator: Arc::new(orchestrator),
            staging,
        }
    }
}

impl AppState<LocalEngine> {
    pub fn from_context(context: &AppContext) -> Self {
        Self::new(
            context.repository_manager(),
            context.orchestrator(),
            context.staging_area(),
        )
    }
}

pub fn router<E: DeploymentEngine + 'static>(state: AppState<E>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/repo",
            put(handlers::repo::add::<E>)
                .get(handlers::repo::list::<E>)
                .delete(handlers::repo::remove::<E>),
        )
        .route("/repo/update", post(handlers::repo::update::<E>))
        .route("/install", put(handlers::install::install::<E>))
        .route("/uninstall", delete(handlers::install::uninstall::<E>))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::map_response(json_content_type))
        .with_state(state)
}

/// Router backed by the local engine, wired from `context`.
pub fn app(context: &AppContext) -> Router {
    router(
        AppState::from_context(context),
        context.config().max_upload_bytes,
    )
}

/// Bind the configured address and serve until the process exits.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let context = AppContext::new(config)?;
    let app = app(&context);
    let config = context.config();

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    tracing::info!(
        address = %listener.local_addr()?,
        registry = %config.repository_config.display(),
        cache = %config.repository_cache.display(),
        "chartgate listening"
    );
    axum::serve(listener, app).await.context("HTTP server failed")
}

async fn health() -> Json<&'static str> {
    Json("ok")
}

async fn not_found() -> (StatusCode, Json<&'static str>) {
    (StatusCode::NOT_FOUND, Json("Not Found"))
}

async fn json_content_type(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
