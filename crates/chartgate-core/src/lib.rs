//! Chartgate Core Library
//!
//! Provides the domain logic for managing chart repository registries and
//! driving chart installs and uninstalls against a deployment engine.

pub mod chart;
pub mod config;
pub mod context;
pub mod deploy;
pub mod engine;
pub mod fs;
pub mod getter;
pub mod repo;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::ServerConfig;
    pub use crate::context::AppContext;

    // Registry
    pub use crate::repo::{
        ChartRepository, IndexFile, IndexSynchronizer, RefreshReport, RegistryError, RegistryFile,
        RegistryStore, RepositoryEntry, RepositoryManager,
    };

    // Charts
    pub use crate::chart::{Chart, ChartDependency, ChartMetadata};

    // Engine
    pub use crate::engine::local::LocalEngine;
    pub use crate::engine::{
        ChartReference, DeploymentEngine, InstallTarget, Release, ReleaseStatus, ValueOptions,
    };

    // Deploy
    pub use crate::deploy::{
        ChartRequest, ChartSourceResolver, DeployError, DeploymentOrchestrator, InstallReport,
        StagedUpload, StagingArea, UninstallRequest,
    };

    // Fetching
    pub use crate::getter::{Getter, Getters};
}
