//! Chart metadata and loaded charts.

pub mod loader;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use loader::{load, load_archive_file, load_dir};

/// Chart types that may be installed as a release.
pub const INSTALLABLE_TYPES: &[&str] = &["", "application"];

/// `Chart.yaml` contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub chart_type: String,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

impl ChartMetadata {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("chart.metadata.name is required");
        }
        if self.version.trim().is_empty() {
            anyhow::bail!("chart.metadata.version is required");
        }
        if crate::repo::index::parse_version(&self.version).is_none() {
            anyhow::bail!("chart.metadata.version {:?} is invalid", self.version);
        }
        for dependency in &self.dependencies {
            if dependency.name.trim().is_empty() {
                anyhow::bail!("dependencies must have a name");
            }
        }
        Ok(())
    }

    pub fn is_installable(&self) -> bool {
        INSTALLABLE_TYPES.contains(&self.chart_type.as_str())
    }
}

/// A dependency declared in `Chart.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDependency {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// A loaded chart: metadata, default values and vendored subcharts.
#[derive(Debug, Clone)]
pub struct Chart {
    pub metadata: ChartMetadata,
    /// Parsed `values.yaml` (an empty object when absent)
    pub values: serde_json::Value,
    /// Metadata of charts vendored under `charts/`
    pub vendored: Vec<ChartMetadata>,
    /// Directory or archive the chart was loaded from
    pub source: PathBuf,
}

impl Chart {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Names of declared dependencies with no vendored chart matching the
    /// dependency name or alias.
    pub fn missing_dependencies(&self) -> Vec<String> {
        self.metadata
            .dependencies
            .iter()
            .filter(|dep| {
                !self.vendored.iter().any(|v| {
                    v.name == dep.name || dep.alias.as_deref() == Some(v.name.as_str())
                })
            })
            .map(|dep| dep.name.clone())
            .collect()
    }
}
