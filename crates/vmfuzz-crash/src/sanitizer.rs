// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sanitizer-report recognition: classifies ASan/TSan/MSan/UBSan/LSan
//! banners in raw debugger/agent output into a structured report with a
//! severity and exploitability estimate.

use regex::Regex;
use std::sync::OnceLock;
use vmfuzz_core::{Exploitability, SanitizerKind, Severity};

#[derive(Debug, Clone)]
pub struct SanitizerReport {
    pub kind: SanitizerKind,
    pub error_type: String,
    pub address: Option<String>,
    pub access_kind: Option<String>,
    pub access_size: Option<u32>,
    /// The sanitizer runtime's own thread label (e.g. `T0`), when present.
    pub thread: Option<String>,
    /// The "Shadow bytes around the buggy address" block, verbatim.
    pub shadow_memory: Option<String>,
    /// `#N ...` frame lines from the sanitizer's own backtrace, in order.
    pub frames: Vec<String>,
    pub severity: Severity,
    pub exploitability: Exploitability,
    pub raw: String,
}

fn asan_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"ERROR: AddressSanitizer:\s*(\S+)(?:\s+on address\s+(0x[0-9a-fA-F]+))?")
            .expect("static regex")
    })
}

fn asan_access_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(READ|WRITE) of size (\d+)").expect("static regex"))
}

fn ubsan_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"runtime error:\s*(.+)").expect("static regex"))
}

fn msan_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ERROR: MemorySanitizer:\s*(\S+)").expect("static regex"))
}

fn tsan_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"WARNING: ThreadSanitizer:\s*(.+)").expect("static regex"))
}

fn lsan_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ERROR: LeakSanitizer:\s*(.+)").expect("static regex"))
}

fn thread_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[Tt]hread (T\d+)").expect("static regex"))
}

fn shadow_memory_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Shadow bytes around the buggy address:\n(.*?)(?:\n\n|$)")
            .expect("static regex")
    })
}

fn frame_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*#\d+\s+.*$").expect("static regex"))
}

fn extract_thread(output: &str) -> Option<String> {
    thread_re().captures(output).map(|c| c[1].to_string())
}

fn extract_shadow_memory(output: &str) -> Option<String> {
    shadow_memory_re().captures(output).map(|c| c[1].trim_end().to_string())
}

fn extract_frames(output: &str) -> Vec<String> {
    frame_line_re().find_iter(output).map(|m| m.as_str().trim().to_string()).collect()
}

/// Returns `None` when `output` carries no recognized sanitizer banner.
pub fn parse(output: &str) -> Option<SanitizerReport> {
    if let Some(caps) = asan_header_re().captures(output) {
        let error_type = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        let address = caps.get(2).map(|m| m.as_str().to_string());
        let (access_kind, access_size) = asan_access_re()
            .captures(output)
            .map(|c| {
                (
                    Some(c[1].to_lowercase()),
                    c[2].parse::<u32>().ok(),
                )
            })
            .unwrap_or((None, None));
        let severity = address_severity(&error_type);
        let exploitability = address_exploitability(&error_type);
        return Some(SanitizerReport {
            kind: SanitizerKind::Address,
            error_type,
            address,
            access_kind,
            access_size,
            thread: extract_thread(output),
            shadow_memory: extract_shadow_memory(output),
            frames: extract_frames(output),
            severity,
            exploitability,
            raw: output.to_string(),
        });
    }

    if let Some(caps) = msan_re().captures(output) {
        let error_type = caps[1].to_string();
        return Some(SanitizerReport {
            kind: SanitizerKind::Memory,
            error_type,
            address: None,
            access_kind: None,
            access_size: None,
            thread: extract_thread(output),
            shadow_memory: extract_shadow_memory(output),
            frames: extract_frames(output),
            severity: Severity::High,
            exploitability: Exploitability::Medium,
            raw: output.to_string(),
        });
    }

    if let Some(caps) = tsan_re().captures(output) {
        let error_type = caps[1].trim().to_string();
        return Some(SanitizerReport {
            kind: SanitizerKind::Thread,
            error_type,
            address: None,
            access_kind: None,
            access_size: None,
            thread: extract_thread(output),
            shadow_memory: extract_shadow_memory(output),
            frames: extract_frames(output),
            severity: Severity::Medium,
            exploitability: Exploitability::Low,
            raw: output.to_string(),
        });
    }

    if let Some(caps) = ubsan_re().captures(output) {
        let error_type = caps[1].trim().to_string();
        let severity = if error_type.contains("null pointer") {
            Severity::Low
        } else {
            Severity::Medium
        };
        return Some(SanitizerReport {
            kind: SanitizerKind::UndefinedBehavior,
            error_type,
            address: None,
            access_kind: None,
            access_size: None,
            thread: extract_thread(output),
            shadow_memory: extract_shadow_memory(output),
            frames: extract_frames(output),
            severity,
            exploitability: Exploitability::Medium,
            raw: output.to_string(),
        });
    }

    if let Some(caps) = lsan_re().captures(output) {
        let error_type = caps[1].trim().to_string();
        return Some(SanitizerReport {
            kind: SanitizerKind::Leak,
            error_type,
            address: None,
            access_kind: None,
            access_size: None,
            thread: extract_thread(output),
            shadow_memory: extract_shadow_memory(output),
            frames: extract_frames(output),
            severity: Severity::Low,
            exploitability: Exploitability::Low,
            raw: output.to_string(),
        });
    }

    None
}

fn address_severity(error_type: &str) -> Severity {
    let et = error_type.to_lowercase();
    if et.contains("use-after-free") || et.contains("double-free") || et.contains("buffer-overflow") {
        Severity::Critical
    } else {
        Severity::High
    }
}

fn address_exploitability(error_type: &str) -> Exploitability {
    let et = error_type.to_lowercase();
    if et.contains("heap-buffer-overflow") || et.contains("use-after-free") || et.contains("double-free") {
        Exploitability::High
    } else if et.contains("stack-buffer-overflow") || et.contains("global-buffer-overflow") || et.contains("overflow") {
        Exploitability::Medium
    } else if et.contains("null") {
        Exploitability::Low
    } else {
        Exploitability::Medium
    }
}

/// Fallback exploitability estimate when no sanitizer banner is present:
/// a fingerprint instruction pointer (the classic `0x41414141` pattern)
/// signals a controlled-PC crash; a near-null target is low severity.
pub fn fallback_exploitability(signal: &str, instruction_pointer: Option<&str>) -> Exploitability {
    let is_segv_or_ill = matches!(signal, "SIGSEGV" | "SIGILL");
    if !is_segv_or_ill {
        return Exploitability::Unknown;
    }
    match instruction_pointer {
        Some(ip) if ip.eq_ignore_ascii_case("0x41414141") => Exploitability::High,
        Some(ip) if is_null_ish(ip) => Exploitability::Low,
        _ => Exploitability::Medium,
    }
}

fn is_null_ish(ip: &str) -> bool {
    let hex = ip.trim_start_matches("0x").trim_start_matches("0X");
    hex.chars().all(|c| c == '0') || u64::from_str_radix(hex, 16).map(|v| v < 0x1000).unwrap_or(false)
}

#[cfg(test)]
#[path = "sanitizer_tests.rs"]
mod tests;
