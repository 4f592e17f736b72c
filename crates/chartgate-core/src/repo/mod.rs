//! Repository registry
//!
//! The registry is a YAML file listing remote chart repositories. It is the
//! only shared mutable state of the service and is guarded by an advisory
//! lock on a sibling `.lock` file so several processes can share it.

pub mod chart_repository;
pub mod entry;
pub mod error;
pub mod index;
pub mod lock;
pub mod manager;
pub mod store;
pub mod sync;

pub use chart_repository::{ChartRepository, archive_cache_dir, index_cache_path};
pub use entry::{RegistryFile, RepositoryEntry};
pub use error::RegistryError;
pub use index::{ChartVersion, IndexFile};
pub use lock::RegistryLock;
pub use manager::{AddOutcome, RepositoryManager};
pub use store::RegistryStore;
pub use sync::{IndexSynchronizer, RefreshFailure, RefreshReport};
