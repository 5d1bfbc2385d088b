// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use vmfuzz_core::{Exploitability, JobCounters};

fn sample_job(store: &Store, id: i64) -> JobId {
    let job = Job {
        id: JobId::new(id),
        name: "nightly".to_string(),
        disk_image: "/images/target.qcow2".into(),
        snapshot_name: Some("clean".to_string()),
        fuzzer_kind: "generic".to_string(),
        fuzzer_config: serde_json::Value::Null,
        created_at_ms: 1_700_000_000_000,
        status: JobStatus::Running,
        counters: JobCounters::default(),
    };
    store.insert_job(&job).unwrap();
    job.id
}

fn crash_with(id: i64, job_id: JobId, signature: &str) -> Crash {
    Crash {
        id: CrashId::new(id),
        job_id,
        testcase_path: "/tmp/input.bin".into(),
        kind: "buffer_overflow".to_string(),
        detail: "heap overflow".to_string(),
        signature: signature.to_string(),
        exploitability: Exploitability::High,
        artifact_path: None,
        timestamp_ms: 1_700_000_000_000,
        duplicate_count: 0,
        backtrace: None,
        crash_address: None,
        sanitizer_kind: None,
        sanitizer_report: None,
        severity: None,
        is_unique: true,
    }
}

#[test]
fn duplicate_crash_detection_keeps_one_row_and_counts_duplicates() {
    let store = Store::open_in_memory().unwrap();
    let job_id = sample_job(&store, 1);

    store.insert_crash(&crash_with(1, job_id, "sig-a")).unwrap();
    store.insert_crash(&crash_with(2, job_id, "sig-a")).unwrap();
    store.insert_crash(&crash_with(3, job_id, "sig-a")).unwrap();
    store.insert_crash(&crash_with(4, job_id, "sig-a")).unwrap();

    let crashes = store.list_crashes_for_job(job_id).unwrap();
    assert_eq!(crashes.len(), 1);
    assert_eq!(crashes[0].duplicate_count, 3);
}

#[test]
fn different_signatures_yield_separate_rows() {
    let store = Store::open_in_memory().unwrap();
    let job_id = sample_job(&store, 1);

    store.insert_crash(&crash_with(1, job_id, "sig-a")).unwrap();
    store.insert_crash(&crash_with(2, job_id, "sig-b")).unwrap();

    let crashes = store.list_crashes_for_job(job_id).unwrap();
    assert_eq!(crashes.len(), 2);
}

#[test]
fn job_delete_cascades_to_crashes_and_testcases() {
    let store = Store::open_in_memory().unwrap();
    let job_id = sample_job(&store, 1);
    store.insert_crash(&crash_with(1, job_id, "sig-a")).unwrap();
    store.insert_testcase(&TestCase {
        id: vmfuzz_core::TestCaseId::new(1),
        job_id,
        vm_id: vmfuzz_core::VmId::new(1),
        path: "/tmp/t.bin".into(),
        start_time_ms: 1,
        duration_ms: 2.0,
    }).unwrap();

    store.delete_job(job_id).unwrap();

    assert!(store.get_job(job_id).unwrap().is_none());
    assert!(store.list_crashes_for_job(job_id).unwrap().is_empty());
}

#[test]
fn total_testcases_is_set_at_most_once() {
    let store = Store::open_in_memory().unwrap();
    let job_id = sample_job(&store, 1);
    store.set_total_testcases_once(job_id, 100).unwrap();
    store.set_total_testcases_once(job_id, 999).unwrap();
    let job = store.get_job(job_id).unwrap().unwrap();
    assert_eq!(job.counters.total_testcases, Some(100));
}

#[test]
fn generated_testcases_increments_monotonically() {
    let store = Store::open_in_memory().unwrap();
    let job_id = sample_job(&store, 1);
    store.record_testcase_generated(job_id).unwrap();
    store.record_testcase_generated(job_id).unwrap();
    let job = store.get_job(job_id).unwrap().unwrap();
    assert_eq!(job.counters.generated_testcases, 2);
}

#[test]
fn crash_round_trips_backtrace_and_sanitizer_fields() {
    let store = Store::open_in_memory().unwrap();
    let job_id = sample_job(&store, 1);
    let mut crash = crash_with(1, job_id, "sig-a");
    crash.backtrace = Some(vec![vmfuzz_core::StackFrame {
        index: 0,
        function: "vulnerable_func".to_string(),
        file: Some("main.c".to_string()),
        line: Some(42),
        column: None,
    }]);
    crash.sanitizer_kind = Some(vmfuzz_core::SanitizerKind::Address);
    crash.severity = Some(vmfuzz_core::Severity::Critical);
    store.insert_crash(&crash).unwrap();

    let fetched = store.get_crash(CrashId::new(1)).unwrap().unwrap();
    assert_eq!(fetched.backtrace.unwrap().len(), 1);
    assert_eq!(fetched.sanitizer_kind, Some(vmfuzz_core::SanitizerKind::Address));
    assert_eq!(fetched.severity, Some(vmfuzz_core::Severity::Critical));
}
