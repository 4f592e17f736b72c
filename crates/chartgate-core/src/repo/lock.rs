//! Cross-process advisory lock for the registry file.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use super::RegistryError;

/// Exclusive lock on a registry lock-file, released on drop.
#[derive(Debug)]
pub struct RegistryLock {
    file: File,
    path: PathBuf,
}

impl RegistryLock {
    /// Acquire the lock, retrying every `retry` until `timeout` has elapsed.
    ///
    /// Fails with [`RegistryError::LockTimeout`] once the deadline passes; the
    /// caller must not touch the registry without the lock.
    pub fn acquire(path: &Path, timeout: Duration, retry: Duration) -> Result<Self, RegistryError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|source| RegistryError::Access {
                path: path.to_path_buf(),
                source,
            })?;

        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if is_contended(&err) => {}
                Err(source) => {
                    return Err(RegistryError::Access {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(path = %path.display(), "registry lock wait timed out");
                return Err(RegistryError::LockTimeout {
                    path: path.to_path_buf(),
                    waited: now - started,
                });
            }
            std::thread::sleep(retry.min(deadline - now));
        }
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release registry lock");
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
