//! Registry file persistence.
//!
//! Every read and every read-modify-write cycle happens under the registry
//! lock. Nothing is cached between calls: the file on disk is the single
//! source of truth for all processes sharing it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use super::entry::REGISTRY_API_VERSION;
use super::{RegistryError, RegistryFile, RegistryLock};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LOCK_RETRY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
    lock_timeout: Duration,
    lock_retry: Duration,
}

impl RegistryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_retry: DEFAULT_LOCK_RETRY,
        }
    }

    pub fn with_lock_timing(mut self, timeout: Duration, retry: Duration) -> Self {
        self.lock_timeout = timeout;
        self.lock_retry = retry;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling lock-file: the registry path with its extension replaced by `lock`.
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Read the registry under the lock. A missing file is an empty registry.
    pub fn load(&self) -> Result<RegistryFile, RegistryError> {
        let _lock = self.lock()?;
        self.read()
    }

    /// Run a read-modify-write cycle while holding the lock.
    ///
    /// The file is persisted only when `f` succeeds.
    pub fn update<T>(
        &self,
        f: impl FnOnce(&mut RegistryFile) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let _lock = self.lock()?;
        let mut file = self.read()?;
        let value = f(&mut file)?;
        self.write(&mut file)?;
        Ok(value)
    }

    /// Replace the registry contents under the lock.
    pub fn save(&self, file: &RegistryFile) -> Result<(), RegistryError> {
        let _lock = self.lock()?;
        let mut file = file.clone();
        self.write(&mut file)
    }

    fn lock(&self) -> Result<RegistryLock, RegistryError> {
        crate::fs::ensure_parent_dir(&self.path).map_err(|source| RegistryError::Access {
            path: self.path.clone(),
            source,
        })?;
        RegistryLock::acquire(&self.lock_path(), self.lock_timeout, self.lock_retry)
    }

    fn read(&self) -> Result<RegistryFile, RegistryError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RegistryFile::new());
            }
            Err(source) => {
                return Err(RegistryError::Access {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(RegistryFile::new());
        }

        serde_yaml_ng::from_str(&content).map_err(|err| RegistryError::Corrupted {
            path: self.path.clone(),
            message: err.to_string(),
        })
    }

    fn write(&self, file: &mut RegistryFile) -> Result<(), RegistryError> {
        if file.api_version.is_empty() {
            file.api_version = REGISTRY_API_VERSION.to_string();
        }
        file.generated = Some(Utc::now());

        let content = serde_yaml_ng::to_string(file).map_err(|err| RegistryError::Persistence {
            path: self.path.clone(),
            cause: err.into(),
        })?;
        crate::fs::write_atomic(&self.path, content.as_bytes()).map_err(|cause| {
            RegistryError::Persistence {
                path: self.path.clone(),
                cause,
            }
        })?;
        tracing::debug!(path = %self.path.display(), repositories = file.len(), "registry persisted");
        Ok(())
    }
}
