// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job archives: a gzipped tar of the disk image and seed corpus, built by
//! the controller before a `PUSH_JOB` and unpacked by the worker after one.

use crate::error::DispatchError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

const DISK_IMAGE_ENTRY: &str = "disk.qcow2";
const CORPUS_DIR_ENTRY: &str = "corpus";

/// Builds `<dest>/job_<job_id>.tar.gz` containing `disk_image` and every
/// file under `corpus_dir`. Returns the archive path and its byte size,
/// the `package_size` field of the `PUSH_JOB` envelope.
pub fn pack_job_archive(dest: &Path, job_id: i64, disk_image: &Path, corpus_dir: &Path) -> Result<(PathBuf, u64), DispatchError> {
    std::fs::create_dir_all(dest)?;
    let archive_path = dest.join(format!("job_{job_id}.tar.gz"));
    let file = File::create(&archive_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    builder.append_path_with_name(disk_image, DISK_IMAGE_ENTRY)?;
    builder.append_dir_all(CORPUS_DIR_ENTRY, corpus_dir)?;
    builder.into_inner()?.finish()?;

    let size = std::fs::metadata(&archive_path)?.len();
    Ok((archive_path, size))
}

/// Returns `true` when `path` (as recorded in a tar entry) would escape the
/// directory it is extracted into: an absolute path, a `..` component, or
/// (defensively, since this tool never builds Windows-style archives) a
/// leading backslash.
fn escapes_destination(path: &Path) -> bool {
    if path.to_string_lossy().starts_with('\\') {
        return true;
    }
    path.components().any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

/// Extracts `archive_path` into `job_dir`, skipping any member whose path
/// would escape `job_dir`. Returns the paths of the disk image and corpus
/// directory inside `job_dir`.
pub fn unpack_job_archive(archive_path: &Path, job_dir: &Path) -> Result<(PathBuf, PathBuf), DispatchError> {
    std::fs::create_dir_all(job_dir)?;
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let member_path = entry.path()?.to_path_buf();
        if escapes_destination(&member_path) {
            tracing::warn!(path = %member_path.display(), "skipping archive member outside the job directory");
            continue;
        }
        entry.unpack_in(job_dir)?;
    }

    Ok((job_dir.join(DISK_IMAGE_ENTRY), job_dir.join(CORPUS_DIR_ENTRY)))
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
