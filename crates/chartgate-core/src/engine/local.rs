//! Filesystem-backed deployment engine.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;

use super::dependencies::DependencyManager;
use super::releases::ReleaseStore;
use super::{ChartReference, DeploymentEngine, InstallTarget, Release, ReleaseStatus, ValueOptions};
use crate::chart::{self, Chart};
use crate::getter::Getters;
use crate::repo::{ChartRepository, RegistryStore};

/// Resolves charts through the repository registry and records releases as
/// JSON files instead of applying them to a cluster.
#[derive(Debug, Clone)]
pub struct LocalEngine {
    registry: RegistryStore,
    getters: Getters,
    repository_cache: PathBuf,
    releases: ReleaseStore,
    dependencies: DependencyManager,
}

impl LocalEngine {
    pub fn new(
        registry: RegistryStore,
        getters: Getters,
        repository_cache: PathBuf,
        releases_dir: PathBuf,
    ) -> Self {
        let dependencies =
            DependencyManager::new(registry.clone(), getters.clone(), repository_cache.clone());
        Self {
            registry,
            getters,
            repository_cache,
            releases: ReleaseStore::new(releases_dir),
            dependencies,
        }
    }

    pub fn releases(&self) -> &ReleaseStore {
        &self.releases
    }

    async fn locate_in_repository(
        &self,
        repo: &str,
        chart: &str,
        version: Option<&str>,
    ) -> anyhow::Result<PathBuf> {
        let registry = self.registry.clone();
        let file = tokio::task::spawn_blocking(move || registry.load())
            .await
            .context("registry read task failed")??;
        let entry = file
            .get(repo)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("repo {} not found", repo))?;

        let repository = ChartRepository::new(entry, &self.getters, self.repository_cache.clone())?;
        let index = repository.index().await?;
        let found = index
            .get(chart, version.unwrap_or_default())
            .with_context(|| format!("chart {:?} not found in {} index", chart, repo))?;

        let dest = repository.archive_cache_path(found);
        if dest.is_file() {
            tracing::debug!(path = %dest.display(), "using cached chart archive");
            return Ok(dest);
        }
        repository.download_chart(found, &dest).await
    }
}

impl DeploymentEngine for LocalEngine {
    async fn locate_chart(&self, reference: &ChartReference) -> anyhow::Result<PathBuf> {
        match reference {
            ChartReference::Local(path) => {
                if !path.exists() {
                    anyhow::bail!("path {:?} not found", path);
                }
                Ok(path.clone())
            }
            ChartReference::Repository {
                repo,
                chart,
                version,
            } => {
                self.locate_in_repository(repo, chart, version.as_deref())
                    .await
            }
        }
    }

    fn load_chart(&self, path: &Path) -> anyhow::Result<Chart> {
        chart::load(path)
    }

    async fn update_dependencies(&self, chart_path: &Path) -> anyhow::Result<()> {
        self.dependencies.update(chart_path).await.map(|_| ())
    }

    fn merge_values(&self, options: &ValueOptions) -> anyhow::Result<serde_json::Value> {
        options.merge_values()
    }

    async fn install(
        &self,
        chart: &Chart,
        values: serde_json::Value,
        target: &InstallTarget,
    ) -> anyhow::Result<Release> {
        let release = Release {
            name: target.release_name.clone(),
            namespace: target.namespace.clone(),
            chart: chart.name().to_string(),
            chart_version: chart.version().to_string(),
            app_version: chart.metadata.app_version.clone(),
            revision: 1,
            status: ReleaseStatus::Deployed,
            installed_at: Utc::now(),
            config: values,
        };
        self.releases.create(&release)?;
        tracing::info!(
            release = %release.name,
            namespace = %release.namespace,
            chart = %release.chart,
            version = %release.chart_version,
            "release installed"
        );
        Ok(release)
    }

    async fn uninstall(&self, release_name: &str, namespace: &str) -> anyhow::Result<Release> {
        let mut release = self.releases.delete(namespace, release_name)?;
        release.status = ReleaseStatus::Uninstalled;
        tracing::info!(release = %release_name, namespace = %namespace, "release uninstalled");
        Ok(release)
    }
}
