use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::*;

use crate::error::{Result, TallyError};

/// Exclusive advisory lock held on a sidecar `<document>.lock` file for as
/// long as the guard lives. The lock file itself is left in place.
pub struct DocumentLock {
    file: File,
    path: PathBuf,
}

impl DocumentLock {
    pub fn lock_path(target: &Path) -> PathBuf {
        let mut name = OsString::from(target.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Blocks until the lock for `target` is acquired
    pub fn acquire(target: &Path) -> Result<Self> {
        let path = Self::lock_path(target);
        let lock_err = |source| TallyError::LockFailure {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(lock_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(lock_err)?;
        FileExt::lock_exclusive(&file).map_err(lock_err)?;
        debug!("Acquired {}", path.display());

        Ok(Self { file, path })
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release {}: {}", self.path.display(), e);
        }
    }
}
