// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash artifact packaging: `crash_<job>_<timestamp>.zip` under the job's
//! crash directory.

use crate::error::CrashPipelineError;
use crate::sanitizer::SanitizerReport;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use vmfuzz_core::{CrashId, JobId, StackFrame};
use zip::write::FileOptions;
use zip::ZipWriter;

#[derive(Serialize)]
struct CrashInfo<'a> {
    crash_id: CrashId,
    job_id: JobId,
    kind: &'a str,
    detail: &'a str,
    signature: &'a str,
    timestamp_ms: u64,
    crash_address: Option<&'a str>,
}

pub struct ArtifactInputs<'a> {
    pub crash_id: CrashId,
    pub job_id: JobId,
    pub timestamp_ms: u64,
    pub kind: &'a str,
    pub detail: &'a str,
    pub signature: &'a str,
    pub crash_address: Option<&'a str>,
    pub testcase_path: &'a Path,
    pub share_dir: Option<&'a Path>,
    pub backtrace: Option<&'a [StackFrame]>,
    pub sanitizer: Option<&'a SanitizerReport>,
}

/// Writes `crash_<job>_<timestamp>.zip` under `crash_dir` and returns its path.
pub fn package(crash_dir: &Path, inputs: &ArtifactInputs<'_>) -> Result<PathBuf, CrashPipelineError> {
    std::fs::create_dir_all(crash_dir).map_err(|e| CrashPipelineError::Io {
        path: crash_dir.to_path_buf(),
        source: e,
    })?;
    let archive_path = crash_dir.join(format!(
        "crash_{}_{}.zip",
        inputs.job_id.get(),
        inputs.timestamp_ms
    ));
    let file = std::fs::File::create(&archive_path).map_err(|e| CrashPipelineError::Io {
        path: archive_path.clone(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let info = CrashInfo {
        crash_id: inputs.crash_id,
        job_id: inputs.job_id,
        kind: inputs.kind,
        detail: inputs.detail,
        signature: inputs.signature,
        timestamp_ms: inputs.timestamp_ms,
        crash_address: inputs.crash_address,
    };
    write_entry(&mut zip, &archive_path, "crash_info.json", options, &serde_json::to_vec_pretty(&info)?)?;

    let testcase_name = inputs
        .testcase_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "testcase.bin".to_string());
    let testcase_bytes = std::fs::read(inputs.testcase_path).map_err(|e| CrashPipelineError::Io {
        path: inputs.testcase_path.to_path_buf(),
        source: e,
    })?;
    write_entry(
        &mut zip,
        &archive_path,
        &format!("testcase/{testcase_name}"),
        options,
        &testcase_bytes,
    )?;

    if let Some(share_dir) = inputs.share_dir {
        add_share_dir(&mut zip, &archive_path, share_dir, share_dir, options)?;
    }

    if let Some(backtrace) = inputs.backtrace {
        let rendered = render_backtrace(backtrace);
        write_entry(&mut zip, &archive_path, "backtrace.txt", options, rendered.as_bytes())?;
    }

    if let Some(sanitizer) = inputs.sanitizer {
        write_entry(&mut zip, &archive_path, "sanitizer_report.txt", options, sanitizer.raw.as_bytes())?;
        let json = serde_json::to_vec_pretty(&SanitizerReportJson::from(sanitizer))?;
        write_entry(&mut zip, &archive_path, "sanitizer_report.json", options, &json)?;
    }

    zip.finish().map_err(|e| CrashPipelineError::Zip {
        path: archive_path.clone(),
        source: e,
    })?;
    Ok(archive_path)
}

fn write_entry(
    zip: &mut ZipWriter<std::fs::File>,
    archive_path: &Path,
    name: &str,
    options: FileOptions,
    bytes: &[u8],
) -> Result<(), CrashPipelineError> {
    zip.start_file(name, options).map_err(|e| CrashPipelineError::Zip {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    zip.write_all(bytes).map_err(|e| CrashPipelineError::Io {
        path: archive_path.to_path_buf(),
        source: e,
    })
}

fn add_share_dir(
    zip: &mut ZipWriter<std::fs::File>,
    archive_path: &Path,
    root: &Path,
    dir: &Path,
    options: FileOptions,
) -> Result<(), CrashPipelineError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CrashPipelineError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| CrashPipelineError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            add_share_dir(zip, archive_path, root, &path, options)?;
        } else {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let bytes = std::fs::read(&path).map_err(|e| CrashPipelineError::Io {
                path: path.clone(),
                source: e,
            })?;
            write_entry(
                zip,
                archive_path,
                &format!("shared/{}", relative.to_string_lossy()),
                options,
                &bytes,
            )?;
        }
    }
    Ok(())
}

fn render_backtrace(frames: &[StackFrame]) -> String {
    let mut out = String::new();
    for frame in frames {
        let file = frame.file.as_deref().unwrap_or("??");
        let line = frame
            .line
            .map(|l| l.to_string())
            .unwrap_or_else(|| "?".to_string());
        out.push_str(&format!("#{} {} at {}:{}\n", frame.index, frame.function, file, line));
    }
    out
}

#[derive(Serialize)]
struct SanitizerReportJson<'a> {
    kind: &'static str,
    error_type: &'a str,
    address: Option<&'a str>,
    access_kind: Option<&'a str>,
    access_size: Option<u32>,
    thread: Option<&'a str>,
    shadow_memory: Option<&'a str>,
    frames: &'a [String],
    severity: String,
    exploitability: String,
}

impl<'a> From<&'a SanitizerReport> for SanitizerReportJson<'a> {
    fn from(report: &'a SanitizerReport) -> Self {
        Self {
            kind: report.kind.as_str(),
            error_type: &report.error_type,
            address: report.address.as_deref(),
            access_kind: report.access_kind.as_deref(),
            access_size: report.access_size,
            thread: report.thread.as_deref(),
            shadow_memory: report.shadow_memory.as_deref(),
            frames: &report.frames,
            severity: format!("{:?}", report.severity),
            exploitability: format!("{:?}", report.exploitability),
        }
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
