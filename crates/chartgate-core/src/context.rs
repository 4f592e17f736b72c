//! Explicit service wiring built from a [`ServerConfig`].

use crate::config::ServerConfig;
use crate::deploy::{DeploymentOrchestrator, StagingArea};
use crate::engine::local::LocalEngine;
use crate::getter::Getters;
use crate::repo::{IndexSynchronizer, RegistryStore, RepositoryManager};

/// Configuration plus the shared getter set; hands out configured services.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    getters: Getters,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let getters = Getters::new(config.http_timeout())?;
        Ok(Self { config, getters })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn getters(&self) -> &Getters {
        &self.getters
    }

    pub fn registry_store(&self) -> RegistryStore {
        RegistryStore::new(self.config.repository_config.clone())
            .with_lock_timing(self.config.lock_timeout(), self.config.lock_retry())
    }

    pub fn repository_manager(&self) -> RepositoryManager {
        RepositoryManager::new(
            self.registry_store(),
            self.getters.clone(),
            self.config.repository_cache.clone(),
        )
    }

    pub fn index_synchronizer(&self) -> IndexSynchronizer {
        IndexSynchronizer::new(self.getters.clone(), self.config.repository_cache.clone())
    }

    pub fn staging_area(&self) -> StagingArea {
        StagingArea::new(self.config.staging_dir.clone())
    }

    pub fn local_engine(&self) -> LocalEngine {
        LocalEngine::new(
            self.registry_store(),
            self.getters.clone(),
            self.config.repository_cache.clone(),
            self.config.releases_dir.clone(),
        )
    }

    pub fn orchestrator(&self) -> DeploymentOrchestrator<LocalEngine> {
        DeploymentOrchestrator::new(self.local_engine())
            .with_dependency_update(self.config.dependency_update)
    }
}
