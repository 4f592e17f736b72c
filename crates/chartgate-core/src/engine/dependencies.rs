//! Fetch missing chart dependencies into `charts/`.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::chart::{self, ChartDependency};
use crate::getter::Getters;
use crate::repo::{ChartRepository, IndexFile, RegistryStore, RepositoryEntry};

#[derive(Debug, Clone)]
pub struct DependencyManager {
    registry: RegistryStore,
    getters: Getters,
    repository_cache: PathBuf,
}

impl DependencyManager {
    pub fn new(registry: RegistryStore, getters: Getters, repository_cache: PathBuf) -> Self {
        Self {
            registry,
            getters,
            repository_cache,
        }
    }

    /// Download every declared dependency that has no vendored chart.
    ///
    /// Only unpacked chart directories can be updated. Returns the archives
    /// written under `charts/`.
    pub async fn update(&self, chart_path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        if !chart_path.is_dir() {
            anyhow::bail!(
                "dependency update requires an unpacked chart directory: {}",
                chart_path.display()
            );
        }
        let chart = chart::load_dir(chart_path)?;
        let missing = chart.missing_dependencies();
        if missing.is_empty() {
            return Ok(Vec::new());
        }

        let charts_dir = chart_path.join("charts");
        let mut written = Vec::new();
        for dependency in chart
            .metadata
            .dependencies
            .iter()
            .filter(|dep| missing.contains(&dep.name))
        {
            let (repository, index) = self.repository_for(dependency).await?;
            let version = index.get(&dependency.name, &dependency.version).with_context(|| {
                format!(
                    "dependency {} {:?} not found in {}",
                    dependency.name,
                    dependency.version,
                    repository.entry().url
                )
            })?;
            let dest = charts_dir.join(format!("{}-{}.tgz", version.name, version.version));
            repository.download_chart(version, &dest).await?;
            tracing::info!(
                chart = %chart.name(),
                dependency = %dependency.name,
                version = %version.version,
                "dependency downloaded"
            );
            written.push(dest);
        }
        Ok(written)
    }

    /// Repository and index serving `dependency`.
    ///
    /// `@name` and `alias:name` refer to registered repositories. A URL uses
    /// the registered repository with the same URL, or is fetched directly.
    async fn repository_for(
        &self,
        dependency: &ChartDependency,
    ) -> anyhow::Result<(ChartRepository, IndexFile)> {
        let reference = dependency.repository.trim();
        if reference.is_empty() {
            anyhow::bail!("dependency {} has no repository", dependency.name);
        }

        let registry = self.registry.clone();
        let file = tokio::task::spawn_blocking(move || registry.load())
            .await
            .context("registry read task failed")??;

        let alias = reference
            .strip_prefix('@')
            .or_else(|| reference.strip_prefix("alias:"));
        if let Some(name) = alias {
            let entry = file.get(name).cloned().ok_or_else(|| {
                anyhow::anyhow!("no repository named {:?} for dependency {}", name, dependency.name)
            })?;
            let repository =
                ChartRepository::new(entry, &self.getters, self.repository_cache.clone())?;
            let index = repository.index().await?;
            return Ok((repository, index));
        }

        let registered = file
            .repositories
            .iter()
            .find(|entry| entry.url.trim_end_matches('/') == reference.trim_end_matches('/'))
            .cloned();
        match registered {
            Some(entry) => {
                let repository =
                    ChartRepository::new(entry, &self.getters, self.repository_cache.clone())?;
                let index = repository.index().await?;
                Ok((repository, index))
            }
            None => {
                tracing::debug!(url = %reference, "fetching unregistered dependency repository");
                let entry = RepositoryEntry::new(dependency.name.clone(), reference);
                let repository =
                    ChartRepository::new(entry, &self.getters, self.repository_cache.clone())?;
                let (index, _) = repository.fetch_index().await?;
                Ok((repository, index))
            }
        }
    }
}
