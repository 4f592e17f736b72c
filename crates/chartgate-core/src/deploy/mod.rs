//! Chart install and uninstall orchestration.

mod error;
mod orchestrator;
mod request;
mod source;
mod staging;

pub use error::DeployError;
pub use orchestrator::{DeploymentOrchestrator, InstallReport};
pub use request::{ChartRequest, DEFAULT_NAMESPACE, UninstallRequest};
pub use source::{ChartSourceResolver, ResolvedSource};
pub use staging::{StagedUpload, StagingArea};
