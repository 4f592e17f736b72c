//! Install and uninstall request bodies.

use serde::{Deserialize, Serialize};

use super::DeployError;
use crate::engine::InstallTarget;

/// Namespace used when a request leaves `releaseName` empty.
pub const DEFAULT_NAMESPACE: &str = "default";

/// The `data` part of an install request.
///
/// `name` is the release name and `releaseName` the namespace it is
/// installed into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartRequest {
    pub name: String,
    pub release_name: String,
    pub repo_name: String,
    /// Client-side path of the uploaded file; informational only
    pub file_path: String,
    pub version: String,
    pub args: String,
    /// Overrides the server-wide dependency update default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_update: Option<bool>,
}

impl ChartRequest {
    pub fn from_json(bytes: &[u8]) -> Result<Self, DeployError> {
        serde_json::from_slice(bytes).map_err(|err| DeployError::Input(err.to_string()))
    }

    pub fn validate(&self) -> Result<(), DeployError> {
        if self.name.trim().is_empty() {
            return Err(DeployError::Input("release name is required".into()));
        }
        Ok(())
    }

    pub fn target(&self) -> InstallTarget {
        InstallTarget {
            release_name: self.name.trim().to_string(),
            namespace: namespace_or_default(&self.release_name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UninstallRequest {
    pub name: String,
    pub release_name: String,
}

impl UninstallRequest {
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.name.trim().is_empty() {
            return Err(DeployError::Input("release name is required".into()));
        }
        Ok(())
    }

    pub fn namespace(&self) -> String {
        namespace_or_default(&self.release_name)
    }
}

fn namespace_or_default(raw: &str) -> String {
    match raw.trim() {
        "" => DEFAULT_NAMESPACE.to_string(),
        namespace => namespace.to_string(),
    }
}
