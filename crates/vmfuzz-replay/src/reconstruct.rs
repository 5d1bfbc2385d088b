// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconstructs what a replay session needs to run — the test case bytes,
//! the disk image, and the snapshot name — from either a stored crash row
//! or a standalone artifact archive.

use crate::error::ReplayError;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use vmfuzz_core::{CrashId, JobId};
use vmfuzz_store::Store;

/// What [`crate::session::launch`] needs to spawn the replay VM.
#[derive(Debug, Clone)]
pub struct ReplayTarget {
    pub job_id: JobId,
    pub crash_id: Option<CrashId>,
    pub disk_image: PathBuf,
    pub snapshot_name: Option<String>,
    pub testcase_path: PathBuf,
}

/// Subset of `crash_info.json` a standalone archive carries; mirrors the
/// fields written by the crash pipeline's artifact packager.
#[derive(Deserialize)]
struct CrashInfo {
    crash_id: i64,
    job_id: i64,
}

/// Reconstructs from a crash already recorded in the store. Falls back to
/// the crash's own `artifact_path` if its `testcase_path` no longer exists
/// on disk (the harness process that wrote it may be long gone).
pub fn from_crash_id(store: &Store, crash_id: CrashId, scratch_dir: &Path) -> Result<ReplayTarget, ReplayError> {
    let crash = store.get_crash(crash_id)?.ok_or(ReplayError::UnknownCrash(crash_id.get()))?;
    let job = store.get_job(crash.job_id)?.ok_or(ReplayError::UnknownJob(crash.job_id.get()))?;

    let testcase_path = if crash.testcase_path.exists() {
        crash.testcase_path.clone()
    } else {
        let archive = crash.artifact_path.as_deref().ok_or(ReplayError::NoTestcaseAvailable)?;
        extract_testcase(archive, scratch_dir)?
    };

    Ok(ReplayTarget {
        job_id: job.id,
        crash_id: Some(crash.id),
        disk_image: job.disk_image,
        snapshot_name: job.snapshot_name,
        testcase_path,
    })
}

/// Reconstructs from a standalone `crash_<job>_<timestamp>.zip` archive.
/// The archive itself has no disk image (that would make it enormous), so
/// the job's `disk_image`/`snapshot_name` are looked up from `store` by
/// the `job_id` embedded in `crash_info.json`, unless `disk_image_override`
/// supplies them directly (the archive was moved off the node that built it).
pub fn from_archive(
    archive: &Path,
    store: Option<&Store>,
    disk_image_override: Option<(PathBuf, Option<String>)>,
    scratch_dir: &Path,
) -> Result<ReplayTarget, ReplayError> {
    let info = read_crash_info(archive)?;
    let testcase_path = extract_testcase(archive, scratch_dir)?;

    let (disk_image, snapshot_name, job_id) = match disk_image_override {
        Some((disk_image, snapshot_name)) => (disk_image, snapshot_name, JobId::new(info.job_id)),
        None => {
            let store = store.ok_or(ReplayError::NoTestcaseAvailable)?;
            let job_id = JobId::new(info.job_id);
            let job = store.get_job(job_id)?.ok_or(ReplayError::UnknownJob(info.job_id))?;
            (job.disk_image, job.snapshot_name, job_id)
        }
    };

    Ok(ReplayTarget {
        job_id,
        crash_id: Some(CrashId::new(info.crash_id)),
        disk_image,
        snapshot_name,
        testcase_path,
    })
}

fn read_crash_info(archive: &Path) -> Result<CrashInfo, ReplayError> {
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut entry = zip.by_name("crash_info.json").map_err(|_| ReplayError::MissingCrashInfo)?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn extract_testcase(archive: &Path, scratch_dir: &Path) -> Result<PathBuf, ReplayError> {
    std::fs::create_dir_all(scratch_dir)?;
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;

    let name = (0..zip.len())
        .map(|i| zip.by_index(i).map(|e| e.name().to_string()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .find(|name| name.starts_with("testcase/"))
        .ok_or(ReplayError::MissingTestcase)?;

    let mut entry = zip.by_name(&name)?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;

    let file_name = Path::new(&name).file_name().ok_or(ReplayError::MissingTestcase)?;
    let dest = scratch_dir.join(file_name);
    std::fs::write(&dest, &bytes)?;
    Ok(dest)
}

#[cfg(test)]
#[path = "reconstruct_tests.rs"]
mod tests;
