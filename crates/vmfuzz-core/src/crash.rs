// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash record and the small enums that classify it.
//!
//! The hashing, normalization, and sanitizer-parsing logic that *produces*
//! a [`Crash`] lives in `vmfuzz-crash`; this module only defines the shape
//! that gets persisted and shipped over the wire.

use crate::id::{CrashId, JobId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One frame of a (possibly partially-parsed) backtrace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub index: u32,
    /// `"??"` when the debugger couldn't resolve a symbol.
    pub function: String,
    /// `None` when the debugger couldn't resolve a source file.
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl StackFrame {
    pub fn unknown(index: u32) -> Self {
        Self {
            index,
            function: "??".to_string(),
            file: None,
            line: None,
            column: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exploitability {
    High,
    Medium,
    Low,
    Unknown,
}

impl Default for Exploitability {
    fn default() -> Self {
        Self::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizerKind {
    Address,
    Thread,
    Memory,
    UndefinedBehavior,
    Leak,
}

impl SanitizerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SanitizerKind::Address => "asan",
            SanitizerKind::Thread => "tsan",
            SanitizerKind::Memory => "msan",
            SanitizerKind::UndefinedBehavior => "ubsan",
            SanitizerKind::Leak => "lsan",
        }
    }
}

/// A deduplicated crash. `duplicate_count` starts at 0 for a freshly
/// inserted row and is incremented every time a later crash hashes to the
/// same signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crash {
    pub id: CrashId,
    pub job_id: JobId,
    pub testcase_path: PathBuf,
    pub kind: String,
    pub detail: String,
    pub signature: String,
    pub exploitability: Exploitability,
    pub artifact_path: Option<PathBuf>,
    pub timestamp_ms: u64,
    pub duplicate_count: u64,
    pub backtrace: Option<Vec<StackFrame>>,
    pub crash_address: Option<String>,
    pub sanitizer_kind: Option<SanitizerKind>,
    pub sanitizer_report: Option<String>,
    pub severity: Option<Severity>,
    pub is_unique: bool,
}
