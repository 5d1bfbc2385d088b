// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn frame(function: &str, file: &str, line: u32) -> StackFrame {
    StackFrame {
        index: 0,
        function: function.to_string(),
        file: Some(file.to_string()),
        line: Some(line),
        column: None,
    }
}

#[test]
fn recompiled_binaries_hash_identically() {
    let a = vec![
        frame("vulnerable_func", "/home/user/project/main.c", 42),
        frame("process_input", "/home/user/project/input.c", 156),
        frame("main", "/home/user/project/main.c", 200),
    ];
    let b = vec![
        frame("vulnerable_func", "/home/user/project/main.c", 45),
        frame("process_input", "/home/user/project/input.c", 160),
        frame("main", "/home/user/project/main.c", 205),
    ];
    assert_eq!(hash_backtrace(&a, 10), hash_backtrace(&b, 10));
}

#[test]
fn different_stacks_hash_differently() {
    let a = vec![frame("vulnerable_func", "main.c", 42)];
    let b = vec![frame("different_func", "other.c", 10)];
    assert_ne!(hash_backtrace(&a, 10), hash_backtrace(&b, 10));
}

#[test]
fn empty_backtrace_hashes_the_placeholder() {
    let empty: Vec<StackFrame> = Vec::new();
    let mut hasher = Sha256::new();
    hasher.update(b"empty_stack");
    assert_eq!(hash_backtrace(&empty, 10), format!("{:x}", hasher.finalize()));
}

#[test]
fn system_library_frames_are_filtered() {
    let frames = vec![
        StackFrame {
            index: 0,
            function: "__memcpy_avx".to_string(),
            file: Some("/lib/x86_64-linux-gnu/libc.so.6".to_string()),
            line: None,
            column: None,
        },
        frame("vulnerable_func", "main.c", 42),
    ];
    let filtered = hash_backtrace(&frames, 10);
    let direct = hash_backtrace(&[frame("vulnerable_func", "main.c", 42)], 10);
    assert_eq!(filtered, direct);
}

#[test]
fn template_parameters_collapse_to_t() {
    let a = frame("std::vector<int, std::allocator<int>>::push_back", "vec.cc", 1);
    let b = frame("std::vector<float>::push_back", "vec.cc", 2);
    assert_eq!(
        hash_backtrace(&[a], 10),
        hash_backtrace(&[b], 10),
        "std:: prefixed frames are filtered as system frames before templates even matter"
    );
}

#[test]
fn signature_prefers_stack_hash_when_backtrace_present() {
    let frames = vec![frame("vulnerable_func", "main.c", 42)];
    let sig = compute_signature(Some("buffer_overflow"), "detail", Some(&frames), 10);
    assert!(matches!(sig, CrashSignature::FromStack(_)));
}

#[test]
fn different_kind_same_stack_yields_different_signatures() {
    let frames = vec![frame("vulnerable_func", "main.c", 42)];
    let sig1 = compute_signature(Some("buffer_overflow"), "d", Some(&frames), 10);
    let sig2 = compute_signature(Some("null_pointer"), "d", Some(&frames), 10);
    assert_ne!(sig1.value(), sig2.value());
}

#[test]
fn no_backtrace_falls_back_to_kind_and_detail() {
    let sig = compute_signature(Some("SIGSEGV"), "raw signal, no symbols", None, 10);
    assert!(matches!(sig, CrashSignature::FromKindAndDetail(_)));
}
