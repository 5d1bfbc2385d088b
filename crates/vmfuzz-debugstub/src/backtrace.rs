// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Regex-based parsing of debugger `bt`/`continue`-crash output into
//! structured frames and register values.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use vmfuzz_core::StackFrame;

fn signal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Program received signal (\w+)").expect("valid regex"))
}

/// Primary pattern: `#N  0xADDR in func (args) at file:line[:col]`.
fn frame_primary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#(\d+)\s+0x[0-9a-fA-F]+\s+in\s+([^\(]+)\([^\)]*\)\s+at\s+([^:]+):(\d+)(?::(\d+))?")
            .expect("valid regex")
    })
}

/// Fallback pattern: tolerates a missing address, e.g. `#N  func (args) at file:line`.
fn frame_fallback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#(\d+)\s+([^\(]+)\([^\)]*\)\s+at\s+([^:]+):(\d+)(?::(\d+))?").expect("valid regex")
    })
}

fn register_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\s+0x([0-9a-fA-F]+)").expect("valid regex"))
}

/// Extracts the signal name reported by the debugger, e.g. `SIGSEGV`.
pub fn extract_signal(output: &str) -> Option<String> {
    signal_re().captures(output).map(|c| c[1].to_string())
}

/// Parses every `#N ...` backtrace line found in `output`, trying the
/// primary pattern first and falling back when it doesn't match.
pub fn parse_backtrace(output: &str) -> Vec<StackFrame> {
    let mut frames = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if let Some(caps) = frame_primary_re().captures(line) {
            frames.push(frame_from_captures(&caps));
        } else if let Some(caps) = frame_fallback_re().captures(line) {
            frames.push(frame_from_captures(&caps));
        }
    }
    frames
}

fn frame_from_captures(caps: &regex::Captures<'_>) -> StackFrame {
    StackFrame {
        index: caps[1].parse().unwrap_or(0),
        function: caps[2].trim().to_string(),
        file: Some(caps[3].to_string()),
        line: caps[4].parse().ok(),
        column: caps.get(5).and_then(|m| m.as_str().parse().ok()),
    }
}

/// Parses register values from the lines following an `info registers`
/// echo, e.g. `rip    0x4011a6    0x4011a6 <main+16>`.
pub fn parse_registers(output: &str) -> HashMap<String, u64> {
    let mut registers = HashMap::new();
    for line in output.lines() {
        if let Some(caps) = register_line_re().captures(line.trim()) {
            if let Ok(value) = u64::from_str_radix(&caps[2], 16) {
                registers.insert(caps[1].to_string(), value);
            }
        }
    }
    registers
}

#[cfg(test)]
#[path = "backtrace_tests.rs"]
mod tests;
