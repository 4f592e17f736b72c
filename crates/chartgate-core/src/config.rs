//! Server configuration.
//!
//! Loaded once at startup from an optional TOML file, then overridden by
//! `CHARTGATE_*` environment variables. Every path the services touch comes
//! from here; nothing reads ambient settings after startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const ENV_LISTEN: &str = "CHARTGATE_LISTEN";
pub const ENV_REPOSITORY_CONFIG: &str = "CHARTGATE_REPOSITORY_CONFIG";
pub const ENV_REPOSITORY_CACHE: &str = "CHARTGATE_REPOSITORY_CACHE";
pub const ENV_RELEASES_DIR: &str = "CHARTGATE_RELEASES_DIR";
pub const ENV_STAGING_DIR: &str = "CHARTGATE_STAGING_DIR";

/// Runtime configuration for the HTTP server and the services behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:9090`
    pub listen: String,
    /// Registry file (list of repositories)
    pub repository_config: PathBuf,
    /// Directory holding downloaded index files and chart archives
    pub repository_cache: PathBuf,
    /// Directory holding release records written by the local engine
    pub releases_dir: PathBuf,
    /// Directory uploaded charts are staged in before install
    pub staging_dir: PathBuf,
    /// Total time to wait for the registry lock
    pub lock_timeout_secs: u64,
    /// Interval between registry lock attempts
    pub lock_retry_millis: u64,
    /// Per-request timeout for index and chart downloads
    pub http_timeout_secs: u64,
    /// Maximum accepted request body size
    pub max_upload_bytes: usize,
    /// Fetch missing chart dependencies unless a request says otherwise
    pub dependency_update: bool,
    /// `tracing` filter directive, used when `RUST_LOG`/`LOG_LEVEL` are unset
    pub log_filter: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .map(|p| p.join("chartgate"))
            .unwrap_or_else(|| PathBuf::from(".chartgate"));
        let cache_dir = dirs::cache_dir()
            .map(|p| p.join("chartgate"))
            .unwrap_or_else(|| config_dir.join("cache"));
        let data_dir = dirs::data_local_dir()
            .map(|p| p.join("chartgate"))
            .unwrap_or_else(|| config_dir.join("data"));

        Self {
            listen: "0.0.0.0:9090".to_string(),
            repository_config: config_dir.join("repositories.yaml"),
            repository_cache: cache_dir.join("repository"),
            releases_dir: data_dir.join("releases"),
            staging_dir: std::env::temp_dir().join("chartgate").join("staging"),
            lock_timeout_secs: 30,
            lock_retry_millis: 1000,
            http_timeout_secs: 30,
            max_upload_bytes: 10 * 1024 * 1024,
            dependency_update: false,
            log_filter: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Configuration with every directory rooted under `base` (for tests and sandboxes).
    pub fn with_base_dir(base: &Path) -> Self {
        Self {
            listen: "127.0.0.1:0".to_string(),
            repository_config: base.join("config").join("repositories.yaml"),
            repository_cache: base.join("cache").join("repository"),
            releases_dir: base.join("releases"),
            staging_dir: base.join("staging"),
            ..Self::default()
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(listen) = non_empty(ENV_LISTEN) {
            self.listen = listen;
        }
        if let Some(path) = non_empty(ENV_REPOSITORY_CONFIG) {
            self.repository_config = PathBuf::from(path);
        }
        if let Some(path) = non_empty(ENV_REPOSITORY_CACHE) {
            self.repository_cache = PathBuf::from(path);
        }
        if let Some(path) = non_empty(ENV_RELEASES_DIR) {
            self.releases_dir = PathBuf::from(path);
        }
        if let Some(path) = non_empty(ENV_STAGING_DIR) {
            self.staging_dir = PathBuf::from(path);
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn lock_retry(&self) -> Duration {
        Duration::from_millis(self.lock_retry_millis)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
