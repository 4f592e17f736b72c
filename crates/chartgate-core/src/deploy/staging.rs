//! Uploaded chart archives staged on disk for the duration of one install.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Extensions kept from the client filename; anything else is dropped.
const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz"];

#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create an empty staged file with a generated unique name.
    pub fn stage(&self, original_name: &str) -> io::Result<StagedUpload> {
        std::fs::create_dir_all(&self.dir)?;
        let suffix = archive_suffix(original_name).unwrap_or(".tgz");
        let file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(suffix)
            .tempfile_in(&self.dir)?;
        tracing::debug!(path = %file.path().display(), original = %original_name, "staging upload");
        let (file, path) = file.into_parts();
        Ok(StagedUpload {
            file: File::from_std(file),
            path,
            original_name: original_name.to_string(),
            len: 0,
        })
    }
}

/// A staged upload. The file is deleted when this value is dropped.
///
/// Chunks are written through tokio's blocking pool, so request handlers can
/// stream a multipart body into it without stalling the runtime.
#[derive(Debug)]
pub struct StagedUpload {
    file: File,
    path: TempPath,
    original_name: String,
    len: u64,
}

impl StagedUpload {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(&mut self) -> io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove the staged file, reporting failures instead of ignoring them.
    pub fn cleanup(self) -> io::Result<()> {
        let StagedUpload { file, path, .. } = self;
        drop(file);
        path.close()
    }
}

fn archive_suffix(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    ARCHIVE_SUFFIXES
        .iter()
        .copied()
        .find(|suffix| lower.ends_with(suffix))
}
