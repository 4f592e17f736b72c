//! Deployment engine interface.
//!
//! The orchestrator only talks to the engine through [`DeploymentEngine`].
//! [`local::LocalEngine`] is the filesystem-backed implementation shipped with
//! the server; it records releases instead of applying resources to a cluster.

pub mod dependencies;
pub mod local;
pub mod releases;
pub mod values;

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::Chart;

pub use values::ValueOptions;

/// Where a chart comes from, before it is located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartReference {
    /// A chart directory or archive already on the local filesystem
    Local(PathBuf),
    /// A chart published in a registered repository
    Repository {
        repo: String,
        chart: String,
        version: Option<String>,
    },
}

impl fmt::Display for ChartReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartReference::Local(path) => write!(f, "{}", path.display()),
            ChartReference::Repository {
                repo,
                chart,
                version: Some(version),
            } => write!(f, "{}/{}@{}", repo, chart, version),
            ChartReference::Repository { repo, chart, .. } => write!(f, "{}/{}", repo, chart),
        }
    }
}

/// Release name and namespace an install targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    pub release_name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseStatus {
    Deployed,
    Uninstalled,
    Failed,
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            ReleaseStatus::Deployed => "deployed",
            ReleaseStatus::Uninstalled => "uninstalled",
            ReleaseStatus::Failed => "failed",
        };
        f.write_str(status)
    }
}

/// An installed instance of a chart, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub name: String,
    pub namespace: String,
    pub chart: String,
    pub chart_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    pub revision: u32,
    pub status: ReleaseStatus,
    pub installed_at: DateTime<Utc>,
    /// User-supplied values the release was installed with
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Declared dependencies with no vendored chart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("found in Chart.yaml, but missing in charts/ directory: {}", .0.join(", "))]
pub struct MissingDependencies(pub Vec<String>);

/// Operations the orchestrator needs from a deployment engine.
pub trait DeploymentEngine: Send + Sync {
    /// Resolve a reference to a chart directory or archive on disk.
    fn locate_chart(
        &self,
        reference: &ChartReference,
    ) -> impl Future<Output = anyhow::Result<PathBuf>> + Send;

    fn load_chart(&self, path: &Path) -> anyhow::Result<Chart>;

    fn check_dependencies(&self, chart: &Chart) -> Result<(), MissingDependencies> {
        let missing = chart.missing_dependencies();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingDependencies(missing))
        }
    }

    /// Fetch missing dependency archives into the chart's `charts/` directory.
    fn update_dependencies(&self, chart_path: &Path)
    -> impl Future<Output = anyhow::Result<()>> + Send;

    fn merge_values(&self, options: &ValueOptions) -> anyhow::Result<serde_json::Value>;

    fn install(
        &self,
        chart: &Chart,
        values: serde_json::Value,
        target: &InstallTarget,
    ) -> impl Future<Output = anyhow::Result<Release>> + Send;

    fn uninstall(
        &self,
        release_name: &str,
        namespace: &str,
    ) -> impl Future<Output = anyhow::Result<Release>> + Send;
}
