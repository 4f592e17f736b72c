//! Scheme-based fetchers for index files and chart archives.
//!
//! A [`Getters`] value is the capability set of every configured fetcher:
//! given a URL it picks the getter registered for the URL scheme.

use std::time::Duration;

use anyhow::Context;
use url::Url;

/// Schemes served by [`Getters`].
pub const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "file"];

/// A single fetcher bound to one family of URL schemes.
#[derive(Debug, Clone)]
pub enum Getter {
    /// `http://` and `https://`
    Http(reqwest::Client),
    /// `file://`
    File,
}

impl Getter {
    /// Download the resource at `url`.
    pub async fn get(&self, url: &Url) -> anyhow::Result<Vec<u8>> {
        match self {
            Getter::Http(client) => {
                let response = client
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("Failed to fetch {}", url))?;

                if !response.status().is_success() {
                    anyhow::bail!("Failed to fetch {}: HTTP {}", url, response.status());
                }

                let bytes = response
                    .bytes()
                    .await
                    .with_context(|| format!("Failed to read response body from {}", url))?;
                Ok(bytes.to_vec())
            }
            Getter::File => {
                let path = url
                    .to_file_path()
                    .map_err(|_| anyhow::anyhow!("Invalid file URL: {}", url))?;
                tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))
            }
        }
    }
}

/// Every configured getter, keyed by URL scheme.
#[derive(Debug, Clone)]
pub struct Getters {
    http: reqwest::Client,
}

impl Getters {
    /// Build the getter set with a per-request timeout for network fetches.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("chartgate/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }

    /// Getter able to serve `scheme`.
    pub fn for_scheme(&self, scheme: &str) -> anyhow::Result<Getter> {
        match scheme {
            "http" | "https" => Ok(Getter::Http(self.http.clone())),
            "file" => Ok(Getter::File),
            other => anyhow::bail!(
                "scheme \"{}\" not supported (supported: {})",
                other,
                SUPPORTED_SCHEMES.join(", ")
            ),
        }
    }

    pub async fn get(&self, url: &Url) -> anyhow::Result<Vec<u8>> {
        self.for_scheme(url.scheme())?.get(url).await
    }
}
