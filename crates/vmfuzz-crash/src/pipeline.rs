// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ties stack hashing and sanitizer parsing together into one crash
//! analysis, given a raw crash outcome from the debug-stub driver or the
//! guest-agent client. Deduplication itself (step 8) and artifact
//! packaging (step 9) are handled by the persistence store and
//! [`crate::artifact`] respectively — this module only classifies.

use crate::sanitizer::{self, SanitizerReport};
use crate::stack_hash::{self, CrashSignature};
use vmfuzz_core::{Exploitability, Severity, StackFrame};

pub const DEFAULT_STACK_DEPTH: usize = 10;

/// A crash as reported by the debug-stub driver (kernel-type) or the
/// guest-agent client (user-type), before hashing and classification.
#[derive(Debug, Clone)]
pub struct RawCrashReport {
    pub kind: String,
    pub detail: String,
    pub backtrace: Option<Vec<StackFrame>>,
    pub crash_address: Option<String>,
    pub instruction_pointer: Option<String>,
    /// Combined debugger/agent stdout, scanned for sanitizer banners.
    pub raw_output: String,
}

#[derive(Debug, Clone)]
pub struct CrashAnalysis {
    pub signature: CrashSignature,
    pub sanitizer: Option<SanitizerReport>,
    pub severity: Option<Severity>,
    pub exploitability: Exploitability,
}

pub fn analyze(report: &RawCrashReport) -> CrashAnalysis {
    analyze_with_depth(report, DEFAULT_STACK_DEPTH)
}

pub fn analyze_with_depth(report: &RawCrashReport, stack_depth: usize) -> CrashAnalysis {
    let signature = stack_hash::compute_signature(
        Some(&report.kind),
        &report.detail,
        report.backtrace.as_deref(),
        stack_depth,
    );

    let sanitizer = sanitizer::parse(&report.raw_output);

    let (severity, exploitability) = match &sanitizer {
        Some(report) => (Some(report.severity), report.exploitability),
        None => (
            None,
            sanitizer::fallback_exploitability(&report.kind, report.instruction_pointer.as_deref()),
        ),
    };

    CrashAnalysis {
        signature,
        sanitizer,
        severity,
        exploitability,
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
