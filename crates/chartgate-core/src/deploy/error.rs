use std::path::PathBuf;

/// Install and uninstall failures, one variant per orchestration step.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid request: {0}")]
    Input(String),

    #[error("no chart repository named and no chart archive uploaded")]
    MissingUpload,

    #[error("failed to stage uploaded chart: {0}")]
    Staging(#[source] std::io::Error),

    #[error("failed to locate chart {reference}: {cause:#}")]
    Locate {
        reference: String,
        cause: anyhow::Error,
    },

    #[error("failed to load chart {}: {cause:#}", path.display())]
    Load { path: PathBuf, cause: anyhow::Error },

    #[error("{chart_type} charts are not installable")]
    InvalidChart { chart_type: String },

    #[error("chart dependencies: {message}")]
    Dependency { message: String },

    #[error("failed to merge values: {cause:#}")]
    Values { cause: anyhow::Error },

    #[error("failed to install release {release}: {cause:#}")]
    Install {
        release: String,
        cause: anyhow::Error,
    },

    #[error("failed to uninstall release {release}: {cause:#}")]
    Uninstall {
        release: String,
        cause: anyhow::Error,
    },
}
