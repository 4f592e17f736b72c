//! Repository registry endpoints.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chartgate_core::engine::DeploymentEngine;
use chartgate_core::repo::{RefreshReport, RepositoryEntry};
use serde::Deserialize;

use super::decode_json;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
struct RemoveRepository {
    name: String,
}

pub async fn add<E: DeploymentEngine + 'static>(
    State(state): State<AppState<E>>,
    body: Bytes,
) -> Result<(StatusCode, Json<&'static str>), ApiError> {
    tracing::debug!("Add Repository Start");
    let entry: RepositoryEntry = decode_json(&body)?;
    let outcome = state.repositories.add(entry).await?;

    let name = outcome.entry.name.clone();
    tokio::spawn(async move {
        match outcome.refresh.await {
            Ok(report) if !report.is_complete() => {
                tracing::warn!(repository = %name, failed = report.failed.len(), "index refresh after add was incomplete");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(repository = %name, error = %err, "index refresh after add did not finish"),
        }
    });

    tracing::debug!("Add Repository End");
    Ok((StatusCode::CREATED, Json("Added Repository")))
}

pub async fn list<E: DeploymentEngine + 'static>(
    State(state): State<AppState<E>>,
) -> Result<Json<Vec<RepositoryEntry>>, ApiError> {
    Ok(Json(state.repositories.list().await?))
}

pub async fn remove<E: DeploymentEngine + 'static>(
    State(state): State<AppState<E>>,
    body: Bytes,
) -> Result<Json<&'static str>, ApiError> {
    tracing::debug!("Remove Repository Start");
    let request: RemoveRepository = decode_json(&body)?;
    state.repositories.remove(&request.name).await?;
    tracing::debug!("Remove Repository End");
    Ok(Json("Repository Removed"))
}

pub async fn update<E: DeploymentEngine + 'static>(
    State(state): State<AppState<E>>,
) -> Result<Json<RefreshReport>, ApiError> {
    Ok(Json(state.repositories.refresh().await?))
}
