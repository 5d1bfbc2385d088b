// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory cross-process locking on a sibling `.lock` file, used by both
//! the config/registry and the resource accountant so concurrent
//! `vmfuzzctl`/daemon processes never interleave a read-modify-write.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Holds an exclusive advisory lock for the lifetime of the guard. The lock
/// is released (and the underlying file closed) on drop.
pub struct FileLock {
    _file: File,
}

impl FileLock {
    pub fn acquire_exclusive(lock_path: &Path) -> Result<Self, (PathBuf, std::io::Error)> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| (lock_path.to_path_buf(), e))?;
        file.lock_exclusive()
            .map_err(|e| (lock_path.to_path_buf(), e))?;
        Ok(Self { _file: file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self._file.unlock();
    }
}

/// Write `contents` to `path` via a temp file in the same directory followed
/// by an atomic rename, so a reader never observes a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!(
        ".{}.tmp-{}",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vmfuzz".to_string()),
        std::process::id()
    ));
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)
}
