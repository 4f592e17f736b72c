//! A single remote chart repository: index download, caching and archive fetch.

use std::path::{Path, PathBuf};

use anyhow::Context;
use url::Url;

use super::{ChartVersion, IndexFile, RepositoryEntry};
use crate::getter::Getters;

/// Cache location of the index for the repository named `name`.
pub fn index_cache_path(cache_dir: &Path, name: &str) -> PathBuf {
    cache_dir.join(format!("{}-index.yaml", name))
}

/// Directory holding chart archives downloaded from the repository `name`.
pub fn archive_cache_dir(cache_dir: &Path, name: &str) -> PathBuf {
    cache_dir.join(name)
}

#[derive(Debug, Clone)]
pub struct ChartRepository {
    entry: RepositoryEntry,
    url: Url,
    getters: Getters,
    cache_dir: PathBuf,
}

impl ChartRepository {
    /// Bind `entry` to the getter serving its URL scheme.
    pub fn new(entry: RepositoryEntry, getters: &Getters, cache_dir: PathBuf) -> anyhow::Result<Self> {
        let url = Url::parse(entry.url.trim())
            .with_context(|| format!("invalid chart URL format: {}", entry.url))?;
        getters.for_scheme(url.scheme())?;
        Ok(Self {
            entry,
            url,
            getters: getters.clone(),
            cache_dir,
        })
    }

    pub fn entry(&self) -> &RepositoryEntry {
        &self.entry
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn index_url(&self) -> anyhow::Result<Url> {
        directory_url(&self.url)
            .join("index.yaml")
            .context("Failed to build index URL")
    }

    pub fn cache_path(&self) -> PathBuf {
        index_cache_path(&self.cache_dir, &self.entry.name)
    }

    /// Cache location of the archive for `version`, scoped to this repository.
    pub fn archive_cache_path(&self, version: &ChartVersion) -> PathBuf {
        archive_cache_dir(&self.cache_dir, &self.entry.name)
            .join(format!("{}-{}.tgz", version.name, version.version))
    }

    /// Store raw index bytes fetched by [`Self::fetch_index`] in the cache.
    pub fn write_cached_index(&self, bytes: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.cache_path();
        crate::fs::write_atomic(&path, bytes)?;
        Ok(path)
    }

    /// Download and validate the index without touching the cache.
    pub async fn fetch_index(&self) -> anyhow::Result<(IndexFile, Vec<u8>)> {
        let url = self.index_url()?;
        let bytes = self.getters.get(&url).await?;
        let index = IndexFile::from_slice(&bytes)
            .with_context(|| format!("{} is not a valid repository index", url))?;
        Ok((index, bytes))
    }

    /// Download the index, validate it and store it in the repository cache.
    pub async fn download_index_file(&self) -> anyhow::Result<PathBuf> {
        let (_, bytes) = self.fetch_index().await?;
        self.write_cached_index(&bytes)
    }

    /// Read the cached index, if one has been downloaded.
    pub fn cached_index(&self) -> anyhow::Result<Option<IndexFile>> {
        let path = self.cache_path();
        match std::fs::read(&path) {
            Ok(bytes) => IndexFile::from_slice(&bytes)
                .with_context(|| format!("Failed to load cached index {}", path.display()))
                .map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Cached index, downloading it first when missing.
    pub async fn index(&self) -> anyhow::Result<IndexFile> {
        if let Some(index) = self.cached_index()? {
            return Ok(index);
        }
        let (index, bytes) = self.fetch_index().await?;
        self.write_cached_index(&bytes)?;
        Ok(index)
    }

    /// Resolve a chart URL from the index against the repository URL.
    pub fn resolve_chart_url(&self, chart_url: &str) -> anyhow::Result<Url> {
        match Url::parse(chart_url) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => directory_url(&self.url)
                .join(chart_url)
                .with_context(|| format!("Failed to resolve chart URL {}", chart_url)),
            Err(err) => Err(err).with_context(|| format!("invalid chart URL {}", chart_url)),
        }
    }

    /// Download the archive for `version` to `dest`.
    pub async fn download_chart(&self, version: &ChartVersion, dest: &Path) -> anyhow::Result<PathBuf> {
        let first = version.urls.first().ok_or_else(|| {
            anyhow::anyhow!(
                "chart {}-{} has no downloadable URLs",
                version.name,
                version.version
            )
        })?;
        let url = self.resolve_chart_url(first)?;
        let bytes = self.getters.get(&url).await?;
        crate::fs::write_atomic(dest, &bytes)?;
        tracing::debug!(chart = %version.name, version = %version.version, path = %dest.display(), "chart downloaded");
        Ok(dest.to_path_buf())
    }
}

/// `url` with a trailing slash so relative joins append instead of replacing
/// the last path segment.
fn directory_url(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn repository(url: &str) -> ChartRepository {
        let getters = Getters::new(Duration::from_secs(5)).unwrap();
        ChartRepository::new(
            RepositoryEntry::new("stable", url),
            &getters,
            PathBuf::from("/cache"),
        )
        .unwrap()
    }

    #[test]
    fn index_url_appends_segment() {
        assert_eq!(
            repository("https://charts.example.com/stable").index_url().unwrap().as_str(),
            "https://charts.example.com/stable/index.yaml"
        );
        assert_eq!(
            repository("https://charts.example.com/stable/").index_url().unwrap().as_str(),
            "https://charts.example.com/stable/index.yaml"
        );
    }

    #[test]
    fn relative_chart_urls_resolve_under_repository() {
        let repo = repository("https://charts.example.com/stable");
        assert_eq!(
            repo.resolve_chart_url("nginx-1.0.0.tgz").unwrap().as_str(),
            "https://charts.example.com/stable/nginx-1.0.0.tgz"
        );
        assert_eq!(
            repo.resolve_chart_url("https://cdn.example.com/nginx-1.0.0.tgz")
                .unwrap()
                .as_str(),
            "https://cdn.example.com/nginx-1.0.0.tgz"
        );
    }

    #[test]
    fn cache_path_uses_repository_name() {
        assert_eq!(
            repository("https://charts.example.com").cache_path(),
            PathBuf::from("/cache/stable-index.yaml")
        );
    }

    #[test]
    fn archive_cache_is_scoped_by_repository() {
        let version = ChartVersion {
            name: "nginx".into(),
            version: "1.0.0".into(),
            app_version: None,
            description: None,
            urls: vec!["nginx-1.0.0.tgz".into()],
            digest: None,
            created: None,
            chart_type: None,
        };
        assert_eq!(
            repository("https://charts.example.com").archive_cache_path(&version),
            PathBuf::from("/cache/stable/nginx-1.0.0.tgz")
        );
    }

    #[test]
    fn rejects_invalid_urls_and_schemes() {
        let getters = Getters::new(Duration::from_secs(5)).unwrap();
        let cache = PathBuf::from("/cache");
        assert!(
            ChartRepository::new(RepositoryEntry::new("a", "not a url"), &getters, cache.clone())
                .is_err()
        );
        assert!(
            ChartRepository::new(RepositoryEntry::new("a", "oci://registry/charts"), &getters, cache)
                .is_err()
        );
    }
}
