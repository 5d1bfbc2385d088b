// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stack normalization and hashing: the primary crash deduplication key.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use vmfuzz_core::StackFrame;

const SYSTEM_LIB_PATH_FRAGMENTS: &[&str] = &[
    "/lib/",
    "/usr/lib/",
    "/lib64/",
    "/usr/lib64/",
    "libc.so",
    "libpthread.so",
    "libstdc++.so",
    "libm.so",
    "ld-linux",
    "linux-vdso.so",
];

const SYSTEM_FUNCTION_PREFIXES: &[&str] = &["__", "_dl_", "_IO_", "std::", "__gnu_cxx::"];

/// Which formula produced a crash's dedup signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrashSignature {
    /// A backtrace was available; the stack hash (optionally combined with
    /// the kind tag) is the dedup key.
    FromStack(String),
    /// No backtrace at all was available; fall back to hashing the raw
    /// kind/detail pair.
    FromKindAndDetail(String),
}

impl CrashSignature {
    pub fn value(&self) -> &str {
        match self {
            CrashSignature::FromStack(s) => s,
            CrashSignature::FromKindAndDetail(s) => s,
        }
    }
}

fn addr_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\(0x[0-9a-fA-F]+\)").expect("static regex"))
}

fn compiler_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\.(clone|cold|isra|constprop|part)\.\d+").expect("static regex")
    })
}

fn template_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^<>]+>").expect("static regex"))
}

fn is_system_lib(frame: &StackFrame) -> bool {
    if let Some(file) = &frame.file {
        if SYSTEM_LIB_PATH_FRAGMENTS.iter().any(|frag| file.contains(frag)) {
            return true;
        }
    }
    SYSTEM_FUNCTION_PREFIXES
        .iter()
        .any(|prefix| frame.function.starts_with(prefix))
}

fn normalize_function(func: &str) -> String {
    if func.is_empty() || func == "??" {
        return "??".to_string();
    }
    let mut out = addr_suffix_re().replace_all(func, "").into_owned();
    out = compiler_suffix_re().replace_all(&out, "").into_owned();

    loop {
        let replaced = template_re().replace_all(&out, "<T>").into_owned();
        if replaced == out {
            break;
        }
        out = replaced;
    }
    out
}

fn normalize_filepath(file: &str) -> String {
    if file.is_empty() {
        return "??".to_string();
    }
    std::path::Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "??".to_string())
}

/// `function@file`, or `None` if the frame carries neither and should be
/// dropped entirely (matches the source's "skip frames without function
/// info" rule).
fn normalize_frame(frame: &StackFrame) -> Option<String> {
    let file = frame.file.as_deref().unwrap_or("??");
    if frame.function == "??" && file == "??" {
        return None;
    }
    let func = normalize_function(&frame.function);
    let file = if file == "??" {
        "??".to_string()
    } else {
        normalize_filepath(file)
    };
    Some(format!("{func}@{file}"))
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 over the normalized, depth-limited, system-library-filtered
/// backtrace, joined by `||`. An empty or fully-filtered backtrace hashes
/// the literal `empty_stack`.
pub fn hash_backtrace(backtrace: &[StackFrame], depth: usize) -> String {
    let mut frames = Vec::new();
    for frame in backtrace {
        if is_system_lib(frame) {
            continue;
        }
        if let Some(normalized) = normalize_frame(frame) {
            frames.push(normalized);
        }
        if frames.len() >= depth {
            break;
        }
    }
    if frames.is_empty() {
        return sha256_hex(b"empty_stack");
    }
    sha256_hex(frames.join("||").as_bytes())
}

/// Computes the crash's dedup signature per the primacy rule: the stack
/// hash (optionally salted with the kind tag) whenever a backtrace was
/// extracted at all, even an empty one; the kind+detail hash only when no
/// backtrace exists.
pub fn compute_signature(
    kind: Option<&str>,
    detail: &str,
    backtrace: Option<&[StackFrame]>,
    depth: usize,
) -> CrashSignature {
    match backtrace {
        Some(frames) => {
            let stack_hash = hash_backtrace(frames, depth);
            match kind {
                Some(k) if !k.is_empty() => {
                    CrashSignature::FromStack(sha256_hex(format!("{k}_{stack_hash}").as_bytes()))
                }
                _ => CrashSignature::FromStack(stack_hash),
            }
        }
        None => {
            let k = kind.unwrap_or("unknown");
            CrashSignature::FromKindAndDetail(sha256_hex(format!("{k}:{detail}").as_bytes()))
        }
    }
}

#[cfg(test)]
#[path = "stack_hash_tests.rs"]
mod tests;
