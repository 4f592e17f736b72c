//! Repository index files (`index.yaml`).

use std::collections::BTreeMap;

use anyhow::Context;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

/// One published version of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVersion {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
}

impl ChartVersion {
    pub fn semver(&self) -> Option<Version> {
        parse_version(&self.version)
    }
}

/// A repository index: chart name to published versions, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<ChartVersion>>,
}

impl IndexFile {
    /// Parse and validate an index document.
    pub fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut index: IndexFile =
            serde_yaml_ng::from_slice(bytes).context("Failed to parse repository index")?;
        if index.api_version.trim().is_empty() {
            anyhow::bail!("no API version specified");
        }
        index.sort_entries();
        Ok(index)
    }

    /// Drop versions that are not semantic versions and order the rest newest first.
    fn sort_entries(&mut self) {
        for (name, versions) in self.entries.iter_mut() {
            versions.retain(|v| {
                let valid = v.semver().is_some();
                if !valid {
                    tracing::warn!(chart = %name, version = %v.version, "skipping index entry with invalid version");
                }
                valid
            });
            versions.sort_by(|a, b| b.semver().cmp(&a.semver()));
        }
        self.entries.retain(|_, versions| !versions.is_empty());
    }

    /// Newest version of `name` satisfying `constraint`.
    ///
    /// An empty constraint selects the newest stable release. A constraint
    /// that parses as an exact version must match exactly; anything else is
    /// treated as a semver requirement such as `^1.2` or `>=1.0, <2`.
    pub fn get(&self, name: &str, constraint: &str) -> anyhow::Result<&ChartVersion> {
        let versions = self
            .entries
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("chart \"{}\" not found in repository index", name))?;

        let constraint = constraint.trim();
        let found = if constraint.is_empty() {
            versions
                .iter()
                .find(|v| v.semver().is_some_and(|sv| sv.pre.is_empty()))
        } else if let Some(exact) = parse_version(constraint) {
            versions.iter().find(|v| v.semver().as_ref() == Some(&exact))
        } else {
            let req = VersionReq::parse(constraint)
                .with_context(|| format!("Invalid version constraint: {}", constraint))?;
            versions
                .iter()
                .find(|v| v.semver().is_some_and(|sv| req.matches(&sv)))
        };

        found.ok_or_else(|| {
            anyhow::anyhow!(
                "chart \"{}\" matching {} not found in repository index",
                name,
                if constraint.is_empty() {
                    "latest"
                } else {
                    constraint
                }
            )
        })
    }
}

/// Parse a chart version, tolerating a leading `v`.
pub fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    Version::parse(raw.strip_prefix('v').unwrap_or(raw)).ok()
}
