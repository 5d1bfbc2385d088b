// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identity, configuration, and state machine.

use crate::clock::Clock;
use crate::id::JobId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Status of a fuzzing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Stopped,
    Completed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Stopped => "stopped",
            JobStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Everything needed to create a new job, supplied by the caller (CLI
/// submit command, or a PUSH_JOB envelope unpacked by a worker).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub disk_image: PathBuf,
    pub snapshot_name: Option<String>,
    pub fuzzer_kind: String,
    /// Free-form fuzzer configuration, passed through to the mutation engine.
    pub fuzzer_config: Value,
}

impl JobConfig {
    /// Rewrite paths embedded in the config to point at a worker-local job
    /// directory after a bundle has been unpacked.
    ///
    /// This is the explicit mapping step called for in the design notes:
    /// the wire-level `JobConfig` and the locally running job's paths are
    /// kept as separate concerns instead of mutating a shared dict in place.
    pub fn localize(&self, job_dir: &std::path::Path) -> JobConfig {
        let disk_name = self
            .disk_image
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("disk.qcow2"));
        JobConfig {
            name: self.name.clone(),
            disk_image: job_dir.join(disk_name),
            snapshot_name: self.snapshot_name.clone(),
            fuzzer_kind: self.fuzzer_kind.clone(),
            fuzzer_config: self.fuzzer_config.clone(),
        }
    }
}

/// Counters tracked for a running job.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct JobCounters {
    /// Set at most once, by the mutation engine's first corpus estimate.
    pub total_testcases: Option<u64>,
    /// Monotonically non-decreasing.
    pub generated_testcases: u64,
    pub vm_count: u32,
}

/// A fuzzing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub disk_image: PathBuf,
    pub snapshot_name: Option<String>,
    pub fuzzer_kind: String,
    pub fuzzer_config: Value,
    pub created_at_ms: u64,
    pub status: JobStatus,
    pub counters: JobCounters,
}

impl Job {
    pub fn new(id: JobId, config: JobConfig, clock: &dyn Clock) -> Self {
        Self {
            id,
            name: config.name,
            disk_image: config.disk_image,
            snapshot_name: config.snapshot_name,
            fuzzer_kind: config.fuzzer_kind,
            fuzzer_config: config.fuzzer_config,
            created_at_ms: clock.epoch_ms(),
            status: JobStatus::Pending,
            counters: JobCounters::default(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Stopped | JobStatus::Completed)
    }

    /// Set the total test-case estimate, honoring the "at most once" invariant.
    pub fn set_total_testcases_once(&mut self, total: u64) {
        if self.counters.total_testcases.is_none() {
            self.counters.total_testcases = Some(total);
        }
    }

    /// Advance the generated-test-case counter; never regresses.
    pub fn record_testcase_generated(&mut self) {
        self.counters.generated_testcases += 1;
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
