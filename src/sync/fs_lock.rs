//! Advisory file lock held for the duration of one sync pass
//!
//! Uses flock() via fs2, so a crashed process never leaves a stale lock: the
//! OS releases it when the file handle goes away.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Lock file path for a given state file (`<state>.lock`)
pub fn lock_path_for(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "sync_state.json".into());
    name.push(".lock");
    state_path.with_file_name(name)
}

/// Guard that holds an exclusive filesystem lock, released on drop
pub struct FsLockGuard {
    _file: File,
    path: PathBuf,
}

impl FsLockGuard {
    /// Try to acquire the lock without blocking
    ///
    /// Returns `Ok(None)` if another holder has it.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>> {
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create lock directory")?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path)
            .context("Failed to create lock file")?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired sync lock: {:?}", lock_path);
                Ok(Some(Self {
                    _file: file,
                    path: lock_path.to_path_buf(),
                }))
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                tracing::debug!("Sync lock held by another holder: {:?}", lock_path);
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to acquire sync lock"),
        }
    }
}

impl Drop for FsLockGuard {
    fn drop(&mut self) {
        // Closing the file releases the lock; the file itself is reused
        tracing::debug!("Releasing sync lock: {:?}", self.path);
    }
}
