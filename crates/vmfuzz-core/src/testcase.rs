// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-case records: one row per harness iteration that actually ran.

use crate::id::{JobId, TestCaseId, VmId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: TestCaseId,
    pub job_id: JobId,
    pub vm_id: VmId,
    pub path: PathBuf,
    pub start_time_ms: u64,
    pub duration_ms: f64,
}
