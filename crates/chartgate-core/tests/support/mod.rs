//! Fixture charts and `file://` chart repositories.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use chartgate_core::getter::Getters;
use chartgate_core::repo::{RegistryStore, RepositoryEntry};
use flate2::Compression;
use flate2::write::GzEncoder;

/// gzip tar archive holding `files` (paths include the chart directory).
pub fn archive(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .expect("Failed to append archive entry");
    }
    builder
        .into_inner()
        .expect("Failed to finish tar stream")
        .finish()
        .expect("Failed to finish gzip stream")
}

/// Minimal packaged chart named `name`.
pub fn chart_archive(name: &str, version: &str, chart_type: &str) -> Vec<u8> {
    let chart_yaml = format!(
        "apiVersion: v2\nname: {}\nversion: {}\ntype: {}\n",
        name, version, chart_type
    );
    let chart_path = format!("{}/Chart.yaml", name);
    let values_path = format!("{}/values.yaml", name);
    archive(&[
        (chart_path.as_str(), chart_yaml.as_str()),
        (values_path.as_str(), "replicaCount: 1\n"),
    ])
}

/// Write an unpacked chart directory and return its path.
pub fn write_chart_dir(parent: &Path, name: &str, chart_yaml: &str) -> PathBuf {
    let dir = parent.join(name);
    std::fs::create_dir_all(&dir).expect("Failed to create chart dir");
    std::fs::write(dir.join("Chart.yaml"), chart_yaml).expect("Failed to write Chart.yaml");
    std::fs::write(dir.join("values.yaml"), "").expect("Failed to write values.yaml");
    dir
}

/// Write a chart repository (index plus archives) for `charts` as
/// `(name, version)` pairs and return its `file://` URL.
pub fn write_repository(dir: &Path, charts: &[(&str, &str)]) -> String {
    std::fs::create_dir_all(dir).expect("Failed to create repository dir");

    let mut index = String::from("apiVersion: v1\nentries:\n");
    let mut names: Vec<&str> = charts.iter().map(|(name, _)| *name).collect();
    names.sort();
    names.dedup();
    for name in names {
        index.push_str(&format!("  {}:\n", name));
        for (_, version) in charts.iter().filter(|(n, _)| *n == name) {
            let file = format!("{}-{}.tgz", name, version);
            std::fs::write(dir.join(&file), chart_archive(name, version, "application"))
                .expect("Failed to write chart archive");
            index.push_str(&format!(
                "    - name: {}\n      version: {}\n      urls:\n        - {}\n",
                name, version, file
            ));
        }
    }
    std::fs::write(dir.join("index.yaml"), index).expect("Failed to write index.yaml");
    file_url(dir)
}

pub fn file_url(dir: &Path) -> String {
    url::Url::from_directory_path(dir)
        .expect("Failed to build file URL")
        .to_string()
}

pub fn getters() -> Getters {
    Getters::new(Duration::from_secs(5)).expect("Failed to build getters")
}

pub fn fast_store(path: PathBuf) -> RegistryStore {
    RegistryStore::new(path).with_lock_timing(Duration::from_secs(5), Duration::from_millis(10))
}

/// Register `entries` directly, bypassing remote validation.
pub fn seed_registry(store: &RegistryStore, entries: &[(&str, &str)]) {
    store
        .update(|file| {
            for (name, url) in entries {
                file.update(RepositoryEntry::new(*name, *url));
            }
            Ok(())
        })
        .expect("Failed to seed registry");
}
