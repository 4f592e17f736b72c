//! Registry error taxonomy.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("repository name ({name}) already exists")]
    Conflict { name: String },

    #[error("invalid repository name: {message}")]
    InvalidName { message: String },

    #[error("no repositories configured")]
    NoRepositories,

    #[error("no repo named {name:?} found")]
    NotFound { name: String },

    #[error("looks like {url:?} is not a valid chart repository or cannot be reached: {cause:#}")]
    RemoteValidation { url: String, cause: anyhow::Error },

    #[error("failed to write registry file {path}: {cause:#}")]
    Persistence { path: PathBuf, cause: anyhow::Error },

    #[error("timed out after {waited:?} waiting for registry lock {path}")]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("registry file corrupted: {path}: {message}")]
    Corrupted { path: PathBuf, message: String },

    #[error("failed to access registry {path}: {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
