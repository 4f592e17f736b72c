//! Install and uninstall endpoints.

use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use chartgate_core::deploy::{ChartRequest, DeployError, StagedUpload, UninstallRequest};
use chartgate_core::engine::DeploymentEngine;

use super::decode_json;
use crate::{ApiError, AppState};

/// `PUT /install`: multipart `data` (JSON request) and an optional chart `file`.
pub async fn install<E: DeploymentEngine + 'static>(
    State(state): State<AppState<E>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<&'static str>), ApiError> {
    tracing::debug!("Install Chart Start");
    let mut multipart = multipart.map_err(|err| ApiError::Input(err.body_text()))?;

    let mut data: Option<Bytes> = None;
    let mut upload: Option<StagedUpload> = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::Input(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "data" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::Input(err.body_text()))?;
                data = Some(bytes);
            }
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let mut staged = state
                    .staging
                    .stage(&file_name)
                    .map_err(DeployError::Staging)?;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|err| ApiError::Input(err.body_text()))?
                {
                    staged
                        .write_chunk(&chunk)
                        .await
                        .map_err(DeployError::Staging)?;
                }
                staged.finish().await.map_err(DeployError::Staging)?;

                // Browsers send an empty part when no file was chosen.
                if staged.is_empty() && file_name.is_empty() {
                    continue;
                }
                tracing::debug!(file = %file_name, bytes = staged.len(), "chart file received");
                upload = Some(staged);
            }
            other => tracing::debug!(field = %other, "ignoring multipart field"),
        }
    }

    let data = data.ok_or_else(|| ApiError::Input("missing data field".into()))?;
    let request = ChartRequest::from_json(&data)?;
    state.orchestrator.install(&request, upload).await?;

    tracing::debug!("Install Chart End");
    Ok((StatusCode::CREATED, Json("Chart Installed Successfully")))
}

/// `DELETE /uninstall` with `{name, releaseName}`.
pub async fn uninstall<E: DeploymentEngine + 'static>(
    State(state): State<AppState<E>>,
    body: Bytes,
) -> Result<Json<&'static str>, ApiError> {
    tracing::debug!("Uninstall Chart Start");
    let request: UninstallRequest = decode_json(&body)?;
    state.orchestrator.uninstall(&request).await?;
    tracing::debug!("Uninstall Chart End");
    Ok(Json("Chart Uninstalled Successfully"))
}
