//! Install and uninstall sequencing.

use std::path::PathBuf;

use serde::Serialize;

use super::{
    ChartRequest, ChartSourceResolver, DeployError, ResolvedSource, StagedUpload, UninstallRequest,
};
use crate::chart::Chart;
use crate::engine::{ChartReference, DeploymentEngine, Release, ValueOptions};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReport {
    pub release: Release,
    pub chart_path: PathBuf,
    pub dependencies_updated: bool,
}

#[derive(Debug)]
pub struct DeploymentOrchestrator<E> {
    engine: E,
    resolver: ChartSourceResolver,
    dependency_update: bool,
}

impl<E: DeploymentEngine> DeploymentOrchestrator<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            resolver: ChartSourceResolver,
            dependency_update: false,
        }
    }

    /// Default for requests that do not set `dependencyUpdate`.
    pub fn with_dependency_update(mut self, enabled: bool) -> Self {
        self.dependency_update = enabled;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Install the chart named by `request`.
    ///
    /// The staged upload is removed before returning, whatever the outcome.
    pub async fn install(
        &self,
        request: &ChartRequest,
        upload: Option<StagedUpload>,
    ) -> Result<InstallReport, DeployError> {
        tracing::debug!(
            name = %request.name,
            namespace = %request.release_name,
            repo = %request.repo_name,
            args = %request.args,
            "install chart start"
        );
        if let Err(err) = request.validate() {
            discard(upload);
            return Err(err);
        }

        let ResolvedSource { reference, staged } = self.resolver.resolve(request, upload)?;
        let result = self.install_from(request, &reference).await;
        discard(staged);

        if let Ok(report) = &result {
            tracing::debug!(
                release = %report.release.name,
                path = %report.chart_path.display(),
                "install chart end"
            );
        }
        result
    }

    async fn install_from(
        &self,
        request: &ChartRequest,
        reference: &ChartReference,
    ) -> Result<InstallReport, DeployError> {
        let chart_path =
            self.engine
                .locate_chart(reference)
                .await
                .map_err(|cause| DeployError::Locate {
                    reference: reference.to_string(),
                    cause,
                })?;
        tracing::debug!(path = %chart_path.display(), "chart located");

        let mut chart = self.load(&chart_path)?;
        if !chart.metadata.is_installable() {
            return Err(DeployError::InvalidChart {
                chart_type: chart.metadata.chart_type.clone(),
            });
        }

        let mut dependencies_updated = false;
        if let Err(missing) = self.engine.check_dependencies(&chart) {
            let auto_update = request.dependency_update.unwrap_or(self.dependency_update);
            if !auto_update {
                return Err(DeployError::Dependency {
                    message: missing.to_string(),
                });
            }

            tracing::info!(chart = %chart.name(), missing = ?missing.0, "updating chart dependencies");
            self.engine
                .update_dependencies(&chart_path)
                .await
                .map_err(|cause| DeployError::Dependency {
                    message: format!("{cause:#}"),
                })?;
            chart = self.load(&chart_path).map_err(|err| DeployError::Dependency {
                message: err.to_string(),
            })?;
            self.engine
                .check_dependencies(&chart)
                .map_err(|missing| DeployError::Dependency {
                    message: missing.to_string(),
                })?;
            dependencies_updated = true;
        }

        let values = self
            .engine
            .merge_values(&ValueOptions::from_args(&request.args))
            .map_err(|cause| DeployError::Values { cause })?;

        let target = request.target();
        let release = self
            .engine
            .install(&chart, values, &target)
            .await
            .map_err(|cause| DeployError::Install {
                release: target.release_name.clone(),
                cause,
            })?;

        Ok(InstallReport {
            release,
            chart_path,
            dependencies_updated,
        })
    }

    pub async fn uninstall(&self, request: &UninstallRequest) -> Result<Release, DeployError> {
        request.validate()?;
        let namespace = request.namespace();
        tracing::debug!(name = %request.name, namespace = %namespace, "uninstall chart start");
        self.engine
            .uninstall(request.name.trim(), &namespace)
            .await
            .map_err(|cause| DeployError::Uninstall {
                release: request.name.clone(),
                cause,
            })
    }

    fn load(&self, path: &std::path::Path) -> Result<Chart, DeployError> {
        self.engine
            .load_chart(path)
            .map_err(|cause| DeployError::Load {
                path: path.to_path_buf(),
                cause,
            })
    }
}

fn discard(upload: Option<StagedUpload>) {
    let Some(upload) = upload else {
        return;
    };
    let path = upload.path().to_path_buf();
    if let Err(err) = upload.cleanup() {
        tracing::warn!(path = %path.display(), error = %err, "failed to remove staged upload");
    }
}
