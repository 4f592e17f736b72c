//! On-disk release records for the local engine.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::Release;

/// Release records stored as `<dir>/<namespace>/<name>.json`.
#[derive(Debug, Clone)]
pub struct ReleaseStore {
    dir: PathBuf,
}

impl ReleaseStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, namespace: &str, name: &str) -> anyhow::Result<PathBuf> {
        validate_segment("release name", name)?;
        validate_segment("namespace", namespace)?;
        Ok(self.dir.join(namespace).join(format!("{}.json", name)))
    }

    pub fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Release>> {
        let path = self.record_path(namespace, name)?;
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse release record {}", path.display()))
                .map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Persist a new release; fails when the name is taken in its namespace.
    ///
    /// The record is linked into place without replacing, so concurrent
    /// creates of one name leave exactly one winner.
    pub fn create(&self, release: &Release) -> anyhow::Result<()> {
        let path = self.record_path(&release.namespace, &release.name)?;
        let json = serde_json::to_vec_pretty(release).context("Failed to serialize release")?;
        match crate::fs::write_new(&path, &json) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                anyhow::bail!("cannot re-use a name that is still in use")
            }
            Err(err) => Err(err).with_context(|| format!("Failed to write {}", path.display())),
        }
    }

    /// Delete a release record and return it.
    pub fn delete(&self, namespace: &str, name: &str) -> anyhow::Result<Release> {
        let release = self
            .get(namespace, name)?
            .ok_or_else(|| anyhow::anyhow!("release: not found"))?;
        let path = self.record_path(namespace, name)?;
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to delete {}", path.display()))?;
        Ok(release)
    }
}

fn validate_segment(kind: &str, value: &str) -> anyhow::Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
    {
        anyhow::bail!("invalid {}: {:?}", kind, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReleaseStatus;
    use chrono::Utc;
    use tempfile::TempDir;

    fn release(name: &str, namespace: &str) -> Release {
        Release {
            name: name.into(),
            namespace: namespace.into(),
            chart: "nginx".into(),
            chart_version: "1.2.3".into(),
            app_version: None,
            revision: 1,
            status: ReleaseStatus::Deployed,
            installed_at: Utc::now(),
            config: serde_json::json!({"replicaCount": 2}),
        }
    }

    #[test]
    fn create_get_delete() {
        let temp = TempDir::new().unwrap();
        let store = ReleaseStore::new(temp.path().to_path_buf());

        store.create(&release("web", "default")).unwrap();
        let loaded = store.get("default", "web").unwrap().unwrap();
        assert_eq!(loaded.config["replicaCount"], 2);
        assert!(store.record_path("default", "web").unwrap().is_file());

        let deleted = store.delete("default", "web").unwrap();
        assert_eq!(deleted.name, "web");
        assert!(store.get("default", "web").unwrap().is_none());
    }

    #[test]
    fn names_are_unique_per_namespace() {
        let temp = TempDir::new().unwrap();
        let store = ReleaseStore::new(temp.path().to_path_buf());

        store.create(&release("web", "default")).unwrap();
        let err = store.create(&release("web", "default")).unwrap_err();
        assert!(err.to_string().contains("cannot re-use a name"));
        store.create(&release("web", "staging")).unwrap();
    }

    #[test]
    fn concurrent_creates_have_one_winner() {
        use std::sync::Barrier;

        let temp = TempDir::new().unwrap();
        let store = ReleaseStore::new(temp.path().to_path_buf());
        const WRITERS: usize = 8;

        for round in 0..20 {
            let name = format!("web{}", round);
            let barrier = Barrier::new(WRITERS);
            let created = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..WRITERS)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            store.create(&release(&name, "default"))
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap())
                    .filter(Result::is_ok)
                    .count()
            });
            assert_eq!(created, 1, "round {round}");
        }
    }

    #[test]
    fn rejects_path_segments() {
        let temp = TempDir::new().unwrap();
        let store = ReleaseStore::new(temp.path().to_path_buf());
        assert!(store.create(&release("../web", "default")).is_err());
        assert!(store.get("..", "web").is_err());
        assert!(store.delete("default", "absent").is_err());
    }
}
