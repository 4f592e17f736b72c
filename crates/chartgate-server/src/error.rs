//! Mapping of domain errors to HTTP responses.
//!
//! Clients only see a short JSON string; the full error chain is logged.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chartgate_core::deploy::DeployError;
use chartgate_core::repo::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("invalid input: {0}")]
    Input(String),
}

impl ApiError {
    pub fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Input(_) => (StatusCode::BAD_REQUEST, "Invalid Input"),
            ApiError::Registry(err) => match err {
                RegistryError::Conflict { .. } => (StatusCode::CONFLICT, "Repository already exists"),
                RegistryError::InvalidName { .. } => (StatusCode::BAD_REQUEST, "Invalid Input"),
                RegistryError::RemoteValidation { .. } => {
                    (StatusCode::BAD_REQUEST, "Invalid Chart Repository")
                }
                RegistryError::Persistence { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error in writing to File")
                }
                RegistryError::NoRepositories => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Repositories Not Configured")
                }
                RegistryError::NotFound { .. } => (StatusCode::NOT_FOUND, "Repository Not found"),
                RegistryError::LockTimeout { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "Repository Registry Busy")
                }
                RegistryError::Corrupted { .. } | RegistryError::Access { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error in reading File")
                }
            },
            ApiError::Deploy(err) => match err {
                DeployError::Input(_) => (StatusCode::BAD_REQUEST, "Invalid Input"),
                DeployError::MissingUpload => (StatusCode::BAD_REQUEST, "Error in uploaded File"),
                DeployError::Staging(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error in uploaded File")
                }
                DeployError::Locate { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error Locating Chart")
                }
                DeployError::Load { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Error loading Chart"),
                DeployError::InvalidChart { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Invalid Chart"),
                DeployError::Dependency { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error in Chart Dependency")
                }
                DeployError::Values { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error getting Chart Options")
                }
                DeployError::Install { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error installing Chart")
                }
                DeployError::Uninstall { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error uninstalling Chart")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "{}", message);
        } else {
            tracing::warn!(status = %status, error = %self, "{}", message);
        }
        (status, Json(message)).into_response()
    }
}
