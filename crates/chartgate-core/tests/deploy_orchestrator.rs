//! Install sequencing against a scripted engine.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chartgate_core::chart::{Chart, ChartDependency, ChartMetadata};
use chartgate_core::deploy::{
    ChartRequest, DeployError, DeploymentOrchestrator, StagingArea, UninstallRequest,
};
use chartgate_core::engine::{
    ChartReference, DeploymentEngine, InstallTarget, Release, ReleaseStatus, ValueOptions,
};
use chrono::Utc;
use tempfile::TempDir;

#[derive(Default)]
struct ScriptedEngine {
    chart_type: String,
    dependencies: Vec<&'static str>,
    fail_locate: bool,
    fail_update: bool,
    fail_install: bool,
    fail_uninstall: bool,
    updated: AtomicBool,
    updates: AtomicUsize,
    installs: AtomicUsize,
    loaded_paths: Mutex<Vec<(PathBuf, bool)>>,
    targets: Mutex<Vec<InstallTarget>>,
}

impl ScriptedEngine {
    fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

fn metadata(name: &str) -> ChartMetadata {
    ChartMetadata {
        name: name.into(),
        version: "1.0.0".into(),
        ..Default::default()
    }
}

impl DeploymentEngine for ScriptedEngine {
    async fn locate_chart(&self, reference: &ChartReference) -> anyhow::Result<PathBuf> {
        if self.fail_locate {
            anyhow::bail!("repo not found");
        }
        Ok(match reference {
            ChartReference::Local(path) => path.clone(),
            ChartReference::Repository { chart, .. } => PathBuf::from(format!("/cache/{chart}.tgz")),
        })
    }

    fn load_chart(&self, path: &Path) -> anyhow::Result<Chart> {
        self.loaded_paths
            .lock()
            .unwrap()
            .push((path.to_path_buf(), path.exists()));
        let mut chart_metadata = metadata("web");
        chart_metadata.chart_type = self.chart_type.clone();
        chart_metadata.dependencies = self
            .dependencies
            .iter()
            .map(|name| ChartDependency {
                name: name.to_string(),
                version: "1.0.0".into(),
                repository: "@stable".into(),
                ..Default::default()
            })
            .collect();
        let vendored = if self.updated.load(Ordering::SeqCst) {
            self.dependencies.iter().map(|name| metadata(name)).collect()
        } else {
            Vec::new()
        };
        Ok(Chart {
            metadata: chart_metadata,
            values: serde_json::json!({}),
            vendored,
            source: path.to_path_buf(),
        })
    }

    async fn update_dependencies(&self, _chart_path: &Path) -> anyhow::Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update {
            anyhow::bail!("repository stable unreachable");
        }
        self.updated.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn merge_values(&self, options: &ValueOptions) -> anyhow::Result<serde_json::Value> {
        options.merge_values()
    }

    async fn install(
        &self,
        chart: &Chart,
        values: serde_json::Value,
        target: &InstallTarget,
    ) -> anyhow::Result<Release> {
        if self.fail_install {
            anyhow::bail!("cluster unreachable");
        }
        self.installs.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target.clone());
        Ok(Release {
            name: target.release_name.clone(),
            namespace: target.namespace.clone(),
            chart: chart.name().to_string(),
            chart_version: chart.version().to_string(),
            app_version: None,
            revision: 1,
            status: ReleaseStatus::Deployed,
            installed_at: Utc::now(),
            config: values,
        })
    }

    async fn uninstall(&self, release_name: &str, namespace: &str) -> anyhow::Result<Release> {
        if self.fail_uninstall {
            anyhow::bail!("release: not found");
        }
        Ok(Release {
            name: release_name.to_string(),
            namespace: namespace.to_string(),
            chart: "web".into(),
            chart_version: "1.0.0".into(),
            app_version: None,
            revision: 1,
            status: ReleaseStatus::Uninstalled,
            installed_at: Utc::now(),
            config: serde_json::json!({}),
        })
    }
}

fn repo_request() -> ChartRequest {
    ChartRequest {
        name: "web".into(),
        release_name: "prod".into(),
        repo_name: "stable".into(),
        ..Default::default()
    }
}

fn upload_request() -> ChartRequest {
    ChartRequest {
        name: "web".into(),
        file_path: "/home/user/web-1.0.0.tgz".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn installs_with_request_target_and_values() {
    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine::default());
    let mut request = repo_request();
    request.args = "image.tag=1.25,replicaCount=2".into();

    let report = orchestrator.install(&request, None).await.expect("install");
    assert_eq!(report.release.name, "web");
    assert_eq!(report.release.namespace, "prod");
    assert_eq!(report.release.config["image"]["tag"], "1.25");
    assert_eq!(report.release.config["replicaCount"], 2);
    assert!(!report.dependencies_updated);
    assert_eq!(report.chart_path, PathBuf::from("/cache/web.tgz"));
    assert_eq!(orchestrator.engine().installs(), 1);
}

#[tokio::test]
async fn library_chart_is_rejected_before_install() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let staged = StagingArea::new(temp.path().to_path_buf())
        .stage("web-1.0.0.tgz")
        .expect("stage");
    let staged_path = staged.path().to_path_buf();

    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine {
        chart_type: "library".into(),
        ..Default::default()
    });
    let err = orchestrator
        .install(&upload_request(), Some(staged))
        .await
        .expect_err("library chart");

    assert!(matches!(err, DeployError::InvalidChart { ref chart_type } if chart_type == "library"));
    assert_eq!(err.to_string(), "library charts are not installable");
    assert_eq!(orchestrator.engine().installs(), 0);
    assert!(!staged_path.exists());
}

#[tokio::test]
async fn unmet_dependencies_without_update_fail() {
    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine {
        dependencies: vec!["redis"],
        ..Default::default()
    });

    let err = orchestrator
        .install(&repo_request(), None)
        .await
        .expect_err("missing dependency");
    match err {
        DeployError::Dependency { message } => assert!(message.contains("redis")),
        other => panic!("expected Dependency, got {other:?}"),
    }
    assert_eq!(orchestrator.engine().updates(), 0);
    assert_eq!(orchestrator.engine().installs(), 0);
}

#[tokio::test]
async fn request_flag_enables_dependency_update() {
    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine {
        dependencies: vec!["redis"],
        ..Default::default()
    });
    let mut request = repo_request();
    request.dependency_update = Some(true);

    let report = orchestrator.install(&request, None).await.expect("install");
    assert!(report.dependencies_updated);
    assert_eq!(orchestrator.engine().updates(), 1);
    assert_eq!(orchestrator.engine().installs(), 1);
}

#[tokio::test]
async fn server_default_applies_unless_request_overrides() {
    let engine = ScriptedEngine {
        dependencies: vec!["redis"],
        ..Default::default()
    };
    let orchestrator = DeploymentOrchestrator::new(engine).with_dependency_update(true);

    let mut opted_out = repo_request();
    opted_out.dependency_update = Some(false);
    let err = orchestrator
        .install(&opted_out, None)
        .await
        .expect_err("request disables update");
    assert!(matches!(err, DeployError::Dependency { .. }));
    assert_eq!(orchestrator.engine().updates(), 0);

    orchestrator
        .install(&repo_request(), None)
        .await
        .expect("default enables update");
    assert_eq!(orchestrator.engine().updates(), 1);
}

#[tokio::test]
async fn failing_dependency_update_stops_install() {
    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine {
        dependencies: vec!["redis"],
        fail_update: true,
        ..Default::default()
    })
    .with_dependency_update(true);

    let err = orchestrator
        .install(&repo_request(), None)
        .await
        .expect_err("update fails");
    match err {
        DeployError::Dependency { message } => assert!(message.contains("unreachable")),
        other => panic!("expected Dependency, got {other:?}"),
    }
    assert_eq!(orchestrator.engine().installs(), 0);
}

#[tokio::test]
async fn locate_failure_is_reported() {
    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine {
        fail_locate: true,
        ..Default::default()
    });

    let err = orchestrator
        .install(&repo_request(), None)
        .await
        .expect_err("locate fails");
    match err {
        DeployError::Locate { reference, .. } => assert_eq!(reference, "stable/web"),
        other => panic!("expected Locate, got {other:?}"),
    }
}

#[tokio::test]
async fn staged_upload_is_removed_after_failed_install() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut staged = StagingArea::new(temp.path().to_path_buf())
        .stage("web-1.0.0.tgz")
        .expect("stage");
    staged.write_chunk(b"chart bytes").await.expect("write");
    staged.finish().await.expect("finish");
    let staged_path = staged.path().to_path_buf();

    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine {
        fail_install: true,
        ..Default::default()
    });
    let err = orchestrator
        .install(&upload_request(), Some(staged))
        .await
        .expect_err("install fails");
    assert!(matches!(err, DeployError::Install { ref release, .. } if release == "web"));

    let loaded = orchestrator.engine().loaded_paths.lock().unwrap().clone();
    assert_eq!(loaded, vec![(staged_path.clone(), true)]);
    assert!(!staged_path.exists());
    assert_eq!(
        std::fs::read_dir(temp.path()).expect("read staging").count(),
        0
    );
}

#[tokio::test]
async fn upload_is_required_without_repository() {
    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine::default());
    let err = orchestrator
        .install(&upload_request(), None)
        .await
        .expect_err("no upload");
    assert!(matches!(err, DeployError::MissingUpload));
    assert_eq!(orchestrator.engine().installs(), 0);
}

#[tokio::test]
async fn malformed_values_are_reported() {
    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine::default());
    let mut request = repo_request();
    request.args = "novalue".into();

    let err = orchestrator
        .install(&request, None)
        .await
        .expect_err("bad args");
    assert!(matches!(err, DeployError::Values { .. }));
    assert_eq!(orchestrator.engine().installs(), 0);
}

#[tokio::test]
async fn empty_namespace_defaults() {
    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine::default());
    let mut request = repo_request();
    request.release_name = String::new();

    orchestrator.install(&request, None).await.expect("install");
    let targets = orchestrator.engine().targets.lock().unwrap().clone();
    assert_eq!(
        targets,
        vec![InstallTarget {
            release_name: "web".into(),
            namespace: "default".into(),
        }]
    );
}

#[tokio::test]
async fn uninstall_outcomes() {
    let orchestrator = DeploymentOrchestrator::new(ScriptedEngine::default());
    let release = orchestrator
        .uninstall(&UninstallRequest {
            name: "web".into(),
            release_name: "prod".into(),
        })
        .await
        .expect("uninstall");
    assert_eq!(release.status, ReleaseStatus::Uninstalled);
    assert_eq!(release.namespace, "prod");

    let failing = DeploymentOrchestrator::new(ScriptedEngine {
        fail_uninstall: true,
        ..Default::default()
    });
    let err = failing
        .uninstall(&UninstallRequest {
            name: "web".into(),
            release_name: String::new(),
        })
        .await
        .expect_err("uninstall fails");
    assert!(matches!(err, DeployError::Uninstall { ref release, .. } if release == "web"));
}
