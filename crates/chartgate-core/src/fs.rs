//! Filesystem helpers shared by the registry, cache and release stores.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use tempfile::NamedTempFile;

/// Write `bytes` to `path` atomically (tmp + rename).
///
/// The temporary file lives in the destination directory so the final rename
/// never crosses a filesystem boundary. On Unix the file is created `0600`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let tmp = write_temp(path, bytes)?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Like [`write_atomic`], but never replaces an existing file.
///
/// Fails with [`std::io::ErrorKind::AlreadyExists`] when `path` is taken, even
/// if another writer created it after this call started.
pub fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = write_temp(path, bytes).map_err(std::io::Error::other)?;
    tmp.persist_noclobber(path).map_err(|err| err.error)?;
    Ok(())
}

fn write_temp(path: &Path, bytes: &[u8]) -> anyhow::Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync temp file for {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set permissions for {}", path.display()))?;
    }
    Ok(tmp)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
