//! Concurrent index refresh for every registered repository.

use std::path::PathBuf;

use serde::Serialize;
use tokio::task::JoinSet;

use super::{ChartRepository, RepositoryEntry};
use crate::getter::Getters;

/// Outcome of a refresh pass. Failures never abort the other repositories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub updated: Vec<String>,
    pub failed: Vec<RefreshFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshFailure {
    pub name: String,
    pub error: String,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct IndexSynchronizer {
    getters: Getters,
    cache_dir: PathBuf,
}

impl IndexSynchronizer {
    pub fn new(getters: Getters, cache_dir: PathBuf) -> Self {
        Self { getters, cache_dir }
    }

    /// Download and cache the index of every entry, one task per entry.
    ///
    /// Waits for all tasks; a failing repository is logged and reported.
    pub async fn refresh_all(&self, entries: &[RepositoryEntry]) -> RefreshReport {
        let mut report = RefreshReport::default();
        if entries.is_empty() {
            tracing::warn!("no repositories found, add one before updating");
            return report;
        }

        tracing::debug!(
            repositories = entries.len(),
            "Hang tight while we grab the latest from your chart repositories..."
        );

        let mut tasks = JoinSet::new();
        for entry in entries.iter().cloned() {
            let getters = self.getters.clone();
            let cache_dir = self.cache_dir.clone();
            tasks.spawn(async move {
                let name = entry.name.clone();
                let url = entry.url.clone();
                let result = refresh_one(entry, &getters, cache_dir).await;
                (name, url, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, _, Ok(path))) => {
                    tracing::debug!(repository = %name, cache = %path.display(), "...Successfully got an update from the chart repository");
                    report.updated.push(name);
                }
                Ok((name, url, Err(err))) => {
                    tracing::warn!(repository = %name, url = %url, error = %format!("{err:#}"), "...Unable to get an update from the chart repository");
                    report.failed.push(RefreshFailure {
                        name,
                        error: format!("{err:#}"),
                    });
                }
                Err(err) => {
                    tracing::warn!(error = %err, "index refresh task did not complete");
                }
            }
        }

        report.updated.sort();
        report.failed.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "Update Complete."
        );
        report
    }
}

async fn refresh_one(
    entry: RepositoryEntry,
    getters: &Getters,
    cache_dir: PathBuf,
) -> anyhow::Result<PathBuf> {
    let repository = ChartRepository::new(entry, getters, cache_dir)?;
    repository.download_index_file().await
}
