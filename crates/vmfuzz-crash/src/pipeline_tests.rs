// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn frame(function: &str, file: &str) -> StackFrame {
    StackFrame {
        index: 0,
        function: function.to_string(),
        file: Some(file.to_string()),
        line: Some(1),
        column: None,
    }
}

#[test]
fn sanitizer_output_overrides_the_fallback_exploitability() {
    let report = RawCrashReport {
        kind: "buffer_overflow".to_string(),
        detail: "heap overflow".to_string(),
        backtrace: Some(vec![frame("vulnerable_func", "main.c")]),
        crash_address: Some("0x602000000010".to_string()),
        instruction_pointer: Some("0x41414141".to_string()),
        raw_output: "ERROR: AddressSanitizer: heap-buffer-overflow on address 0x602000000010\nREAD of size 4".to_string(),
    };
    let analysis = analyze(&report);
    assert_eq!(analysis.exploitability, Exploitability::High);
    assert_eq!(analysis.severity, Some(Severity::Critical));
    assert!(analysis.sanitizer.is_some());
}

#[test]
fn no_sanitizer_falls_back_to_fingerprint_heuristic() {
    let report = RawCrashReport {
        kind: "SIGSEGV".to_string(),
        detail: "segfault".to_string(),
        backtrace: None,
        crash_address: None,
        instruction_pointer: Some("0x41414141".to_string()),
        raw_output: "Program received signal SIGSEGV, Segmentation fault.".to_string(),
    };
    let analysis = analyze(&report);
    assert_eq!(analysis.exploitability, Exploitability::High);
    assert!(analysis.severity.is_none());
    assert!(analysis.sanitizer.is_none());
    assert!(matches!(analysis.signature, CrashSignature::FromKindAndDetail(_)));
}
