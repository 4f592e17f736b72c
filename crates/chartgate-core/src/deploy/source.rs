use super::{ChartRequest, DeployError, StagedUpload};
use crate::engine::ChartReference;

/// A locatable chart reference plus the staged upload backing it, if any.
///
/// The staged file lives as long as this value.
#[derive(Debug)]
pub struct ResolvedSource {
    pub reference: ChartReference,
    pub staged: Option<StagedUpload>,
}

/// Turns an install request into a [`ChartReference`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartSourceResolver;

impl ChartSourceResolver {
    /// A named repository wins over an upload; with no repository the upload
    /// is required.
    pub fn resolve(
        &self,
        request: &ChartRequest,
        upload: Option<StagedUpload>,
    ) -> Result<ResolvedSource, DeployError> {
        let repo = request.repo_name.trim();
        if !repo.is_empty() {
            if let Some(upload) = upload {
                tracing::debug!(
                    file = %upload.original_name(),
                    repo = %repo,
                    "ignoring uploaded file for repository install"
                );
            }
            let version = request.version.trim();
            return Ok(ResolvedSource {
                reference: ChartReference::Repository {
                    repo: repo.to_string(),
                    chart: request.name.trim().to_string(),
                    version: (!version.is_empty()).then(|| version.to_string()),
                },
                staged: None,
            });
        }

        let staged = upload.ok_or(DeployError::MissingUpload)?;
        tracing::debug!(
            file = %staged.original_name(),
            client_path = %request.file_path,
            staged = %staged.path().display(),
            "installing uploaded chart"
        );
        Ok(ResolvedSource {
            reference: ChartReference::Local(staged.path().to_path_buf()),
            staged: Some(staged),
        })
    }
}
