//! Add, remove, list and refresh registered repositories.

use std::path::PathBuf;

use tokio::task::JoinHandle;

use super::{
    ChartRepository, IndexSynchronizer, RefreshReport, RegistryError, RegistryFile, RegistryStore,
    RepositoryEntry, archive_cache_dir, index_cache_path,
};
use crate::getter::Getters;

/// Result of a successful add.
#[derive(Debug)]
pub struct AddOutcome {
    pub entry: RepositoryEntry,
    /// Detached refresh of every registered repository. Dropping the handle
    /// leaves the task running; awaiting it yields the refresh report.
    pub refresh: JoinHandle<RefreshReport>,
}

#[derive(Debug, Clone)]
pub struct RepositoryManager {
    store: RegistryStore,
    getters: Getters,
    cache_dir: PathBuf,
    synchronizer: IndexSynchronizer,
}

impl RepositoryManager {
    pub fn new(store: RegistryStore, getters: Getters, cache_dir: PathBuf) -> Self {
        let synchronizer = IndexSynchronizer::new(getters.clone(), cache_dir.clone());
        Self {
            store,
            getters,
            cache_dir,
            synchronizer,
        }
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    pub fn synchronizer(&self) -> &IndexSynchronizer {
        &self.synchronizer
    }

    pub async fn list(&self) -> Result<Vec<RepositoryEntry>, RegistryError> {
        let file = self.load().await?;
        Ok(file.repositories)
    }

    /// Register a repository after checking its index is reachable and valid.
    pub async fn add(&self, entry: RepositoryEntry) -> Result<AddOutcome, RegistryError> {
        tracing::debug!(name = %entry.name, url = %entry.url, "add repository start");
        RepositoryEntry::validate_name(&entry.name)
            .map_err(|message| RegistryError::InvalidName { message })?;

        if self.load().await?.has(&entry.name) {
            return Err(RegistryError::Conflict {
                name: entry.name.clone(),
            });
        }

        let remote_error = |cause: anyhow::Error| RegistryError::RemoteValidation {
            url: entry.url.clone(),
            cause,
        };
        let repository = ChartRepository::new(entry.clone(), &self.getters, self.cache_dir.clone())
            .map_err(remote_error)?;
        let (_, index_bytes) = repository.fetch_index().await.map_err(remote_error)?;

        // Re-check under the lock: another process may have added the name
        // while the index was downloading. The cache is written only once the
        // entry is ours.
        let store = self.store.clone();
        let inserted = entry.clone();
        let file = self
            .blocking(move || {
                store.update(|file| {
                    if file.has(&inserted.name) {
                        return Err(RegistryError::Conflict {
                            name: inserted.name.clone(),
                        });
                    }
                    file.update(inserted);
                    Ok(file.clone())
                })
            })
            .await?;
        if let Err(err) = repository.write_cached_index(&index_bytes) {
            tracing::warn!(name = %entry.name, error = %err, "failed to cache repository index");
        }
        tracing::info!(name = %entry.name, "{:?} has been added to your repositories", entry.name);

        let synchronizer = self.synchronizer.clone();
        let refresh =
            tokio::spawn(async move { synchronizer.refresh_all(&file.repositories).await });

        Ok(AddOutcome { entry, refresh })
    }

    /// Remove a repository with its cached index and archives.
    pub async fn remove(&self, name: &str) -> Result<RepositoryEntry, RegistryError> {
        tracing::debug!(name = %name, "remove repository start");
        let store = self.store.clone();
        let target = name.to_string();
        let removed = self
            .blocking(move || {
                store.update(|file| {
                    if file.is_empty() {
                        return Err(RegistryError::NoRepositories);
                    }
                    file.remove(&target).ok_or(RegistryError::NotFound {
                        name: target.clone(),
                    })
                })
            })
            .await?;

        let cache = index_cache_path(&self.cache_dir, &removed.name);
        if let Err(err) = std::fs::remove_file(&cache)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %cache.display(), error = %err, "failed to remove cached index");
        }
        let archives = archive_cache_dir(&self.cache_dir, &removed.name);
        if let Err(err) = std::fs::remove_dir_all(&archives)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %archives.display(), error = %err, "failed to remove cached archives");
        }
        tracing::info!(name = %removed.name, "{:?} has been removed from your repositories", removed.name);
        Ok(removed)
    }

    /// Refresh every registered repository's index.
    pub async fn refresh(&self) -> Result<RefreshReport, RegistryError> {
        let file = self.load().await?;
        Ok(self.synchronizer.refresh_all(&file.repositories).await)
    }

    async fn load(&self) -> Result<RegistryFile, RegistryError> {
        let store = self.store.clone();
        self.blocking(move || store.load()).await
    }

    /// Run registry file access off the async workers; the lock wait sleeps.
    async fn blocking<T, F>(&self, f: F) -> Result<T, RegistryError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, RegistryError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|err| RegistryError::Access {
                path: self.store.path().to_path_buf(),
                source: std::io::Error::other(err.to_string()),
            })?
    }
}
