//! Load charts from unpacked directories or `.tgz` archives.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Component, Path};

use anyhow::Context;
use flate2::read::GzDecoder;

use super::{Chart, ChartMetadata};

/// Chart files keyed by `/`-separated path relative to the chart root.
type ChartFiles = BTreeMap<String, Vec<u8>>;

/// Load a chart from a directory or a gzip-compressed tar archive.
pub fn load(path: &Path) -> anyhow::Result<Chart> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat chart path: {}", path.display()))?;
    if metadata.is_dir() {
        load_dir(path)
    } else {
        load_archive_file(path)
    }
}

pub fn load_dir(dir: &Path) -> anyhow::Result<Chart> {
    let mut files = ChartFiles::new();
    collect_dir(dir, dir, &mut files)?;
    from_files(&files, dir)
}

pub fn load_archive_file(path: &Path) -> anyhow::Result<Chart> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open chart archive: {}", path.display()))?;
    load_archive(file, path)
}

/// Load a chart from a gzip tar stream. The first path component of every
/// entry is the chart directory and is stripped.
pub fn load_archive<R: Read>(reader: R, source: &Path) -> anyhow::Result<Chart> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut files = ChartFiles::new();

    let entries = archive
        .entries()
        .with_context(|| format!("Failed to read chart archive: {}", source.display()))?;
    for entry in entries {
        let mut entry =
            entry.with_context(|| format!("Failed to read chart archive: {}", source.display()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path().context("Invalid path in chart archive")?;
        let mut parts = Vec::new();
        for component in path.components().skip(1) {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => anyhow::bail!("chart archive entry {} escapes the chart", path.display()),
            }
        }
        if parts.is_empty() {
            continue;
        }
        let relative = parts.join("/");

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {} from chart archive", relative))?;
        files.insert(relative, bytes);
    }

    from_files(&files, source)
}

fn collect_dir(root: &Path, dir: &Path, files: &mut ChartFiles) -> anyhow::Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_dir(root, &path, files)?;
        } else if file_type.is_file() {
            let relative = path
                .strip_prefix(root)
                .context("chart file outside chart root")?
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let bytes =
                std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            files.insert(relative, bytes);
        }
    }
    Ok(())
}

fn from_files(files: &ChartFiles, source: &Path) -> anyhow::Result<Chart> {
    let chart_yaml = files
        .get("Chart.yaml")
        .ok_or_else(|| anyhow::anyhow!("Chart.yaml file is missing in {}", source.display()))?;
    let metadata: ChartMetadata = serde_yaml_ng::from_slice(chart_yaml)
        .with_context(|| format!("Failed to parse Chart.yaml in {}", source.display()))?;
    metadata
        .validate()
        .with_context(|| format!("Invalid Chart.yaml in {}", source.display()))?;

    let values = match files.get("values.yaml") {
        Some(bytes) => parse_values(bytes)
            .with_context(|| format!("Failed to parse values.yaml in {}", source.display()))?,
        None => serde_json::Value::Object(Default::default()),
    };

    let mut vendored = Vec::new();
    let mut subchart_dirs: BTreeMap<&str, ChartFiles> = BTreeMap::new();
    for (path, bytes) in files {
        let Some(rest) = path.strip_prefix("charts/") else {
            continue;
        };
        match rest.split_once('/') {
            Some((dir, inner)) => {
                subchart_dirs
                    .entry(dir)
                    .or_default()
                    .insert(inner.to_string(), bytes.clone());
            }
            None if rest.ends_with(".tgz") || rest.ends_with(".tar.gz") => {
                let subchart = load_archive(Cursor::new(bytes), &source.join(path))?;
                vendored.push(subchart.metadata);
            }
            None => {}
        }
    }
    for (dir, sub_files) in &subchart_dirs {
        let subchart = from_files(sub_files, &source.join("charts").join(dir))?;
        vendored.push(subchart.metadata);
    }

    Ok(Chart {
        metadata,
        values,
        vendored,
        source: source.to_path_buf(),
    })
}

fn parse_values(bytes: &[u8]) -> anyhow::Result<serde_json::Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    let values: serde_json::Value = serde_yaml_ng::from_slice(bytes)?;
    Ok(match values {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn archive(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn loads_directory_chart_with_vendored_dependencies() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("web");
        std::fs::create_dir_all(root.join("charts").join("redis")).unwrap();
        std::fs::write(
            root.join("Chart.yaml"),
            "apiVersion: v2\nname: web\nversion: 0.1.0\ndependencies:\n  - name: redis\n    version: 17.1.0\n  - name: db\n    version: 1.0.0\n",
        )
        .unwrap();
        std::fs::write(root.join("values.yaml"), "replicaCount: 2\n").unwrap();
        std::fs::write(
            root.join("charts").join("redis").join("Chart.yaml"),
            "name: redis\nversion: 17.1.0\n",
        )
        .unwrap();
        std::fs::write(
            root.join("charts").join("db-1.0.0.tgz"),
            archive(&[("db/Chart.yaml", "name: db\nversion: 1.0.0\n")]),
        )
        .unwrap();

        let chart = load(&root).unwrap();
        assert_eq!(chart.name(), "web");
        assert_eq!(chart.values["replicaCount"], 2);
        let mut vendored: Vec<_> = chart.vendored.iter().map(|m| m.name.as_str()).collect();
        vendored.sort();
        assert_eq!(vendored, ["db", "redis"]);
        assert!(chart.missing_dependencies().is_empty());
    }

    #[test]
    fn loads_archive_chart() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("upload.tgz");
        std::fs::write(
            &path,
            archive(&[
                ("nginx/Chart.yaml", "name: nginx\nversion: 1.2.3\ntype: application\n"),
                ("nginx/values.yaml", ""),
                ("nginx/templates/deployment.yaml", "kind: Deployment\n"),
            ]),
        )
        .unwrap();

        let chart = load(&path).unwrap();
        assert_eq!(chart.name(), "nginx");
        assert_eq!(chart.version(), "1.2.3");
        assert_eq!(chart.values, serde_json::json!({}));
    }

    #[test]
    fn missing_chart_yaml_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.tgz");
        std::fs::write(&path, archive(&[("broken/values.yaml", "a: 1\n")])).unwrap();

        let err = load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Chart.yaml file is missing"));
    }

    #[test]
    fn non_archive_file_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chart.tgz");
        std::fs::write(&path, b"definitely not gzip").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn missing_path_errors() {
        let temp = TempDir::new().unwrap();
        assert!(load(&temp.path().join("absent")).is_err());
    }
}
