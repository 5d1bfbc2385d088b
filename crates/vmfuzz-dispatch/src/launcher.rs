// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seam between a worker's dispatch server and the local fuzzing harness.
//! The worker only knows how to unpack a job and hand it off; what actually
//! drives the VMs is injected, so this crate never depends on the harness.

use async_trait::async_trait;
use std::path::PathBuf;

/// Everything the harness needs to start a job that was just unpacked from
/// a `PUSH_JOB` archive.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub job_id: i64,
    pub job_dir: PathBuf,
    pub disk_image: PathBuf,
    pub corpus_dir: PathBuf,
    pub config: serde_json::Value,
}

#[async_trait]
pub trait JobLauncher: Send + Sync {
    /// Starts a job on its own task/thread and returns immediately; the
    /// worker learns the outcome later through `STATUS_REQUEST` polling,
    /// not through this call's return value.
    async fn launch(&self, request: LaunchRequest) -> Result<(), crate::error::DispatchError>;
}
