// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;
use vmfuzz_config::{AccountantPolicy, FakeSystemStatsSampler, SystemStats};
use vmfuzz_core::{FakeClock, JobConfig, JobStatus};
use vmfuzz_emulator::{DisplayMode, ShareTransport};

fn sample_config(root: &Path) -> HarnessConfig {
    HarnessConfig {
        arch: "x86_64".to_string(),
        disk_image: root.join("disk.qcow2"),
        snapshot_name: Some("clean".to_string()),
        share_transport: ShareTransport::Smb,
        display: DisplayMode::Off,
        enable_time_compression: false,
        max_parallel_vms: 0,
        session_timeout: Duration::from_secs(30),
        crash_dir: root.join("crashes"),
        vm_scratch_root: root.join("scratch"),
        rebalance_every: 10,
    }
}

fn sample_job() -> Job {
    Job::new(
        JobId::new(1),
        JobConfig {
            name: "nightly".to_string(),
            disk_image: PathBuf::from("/images/target.qcow2"),
            snapshot_name: Some("clean".to_string()),
            fuzzer_kind: "generic".to_string(),
            fuzzer_config: serde_json::Value::Null,
        },
        &FakeClock::default(),
    )
}

fn dummy_vm_record(id: VmId) -> VmRecord {
    VmRecord {
        id,
        pid: u32::MAX,
        arch: "x86_64".to_string(),
        disk_image: PathBuf::from("/images/target.qcow2"),
        share_dir: PathBuf::from("/tmp/does-not-exist-vmfuzz-harness-test"),
        ports: vmfuzz_core::VmPorts { debug_stub: 1, monitor: 2, guest_agent: 3, vnc: None },
        snapshot_name: Some("clean".to_string()),
        status: vmfuzz_core::VmStatus::Running,
        current_job: None,
        current_test: None,
    }
}

fn build_harness(root: &std::path::Path, total_max_vms: Option<SystemStats>) -> Harness {
    let corpus_dir = root.join("corpus");
    fs::create_dir_all(&corpus_dir).unwrap();
    fs::write(corpus_dir.join("seed0.bin"), b"AAAAAAAA").unwrap();
    let output_dir = root.join("mutate-out");

    let state_dir = root.join("state");
    fs::create_dir_all(&state_dir).unwrap();
    let stats = total_max_vms.unwrap_or(SystemStats { cpu_percent_used: 0.0, memory_total_mb: 8192.0, memory_used_mb: 0.0 });
    let accountant = Arc::new(ResourceAccountant::new(
        &state_dir,
        AccountantPolicy::default(),
        Box::new(FakeSystemStatsSampler(stats)),
    ));
    let registry = Registry::new(&state_dir);
    let store = Store::open_in_memory().unwrap();
    let clock = Arc::new(FakeClock::default());

    Harness::new(
        sample_job(),
        sample_config(root),
        &corpus_dir,
        &output_dir,
        accountant,
        Box::new(FakeSystemStatsSampler(stats)),
        registry,
        store,
        clock,
    )
    .unwrap()
}

#[test]
fn new_registers_the_process_instance_and_starts_with_no_live_vms() {
    let dir = tempfile::tempdir().unwrap();
    let harness = build_harness(dir.path(), None);
    assert_eq!(harness.pid, std::process::id());
    assert!(harness.vms.is_empty());
    assert_eq!(harness.job_id(), JobId::new(1));
    assert_eq!(harness.job.status, JobStatus::Pending);
}

#[test]
fn alloc_ids_are_monotonic_and_independent_per_kind() {
    let dir = tempfile::tempdir().unwrap();
    let harness = build_harness(dir.path(), None);
    assert_eq!(harness.alloc_testcase_id(), TestCaseId::new(1));
    assert_eq!(harness.alloc_testcase_id(), TestCaseId::new(2));
    assert_eq!(harness.alloc_crash_id(), CrashId::new(1));
    assert_eq!(harness.alloc_testcase_id(), TestCaseId::new(3));
}

#[test]
fn spawn_request_reflects_harness_config() {
    let dir = tempfile::tempdir().unwrap();
    let harness = build_harness(dir.path(), None);
    let share_dir = dir.path().join("vm-0/share");
    let req = harness.spawn_request(share_dir.clone());
    assert_eq!(req.arch, "x86_64");
    assert_eq!(req.snapshot_name.as_deref(), Some("clean"));
    assert_eq!(req.share_dir, share_dir);
    assert_eq!(req.share_transport, ShareTransport::Smb);
    assert!(!req.enable_time_compression);
}

#[tokio::test]
async fn release_vm_unregisters_the_slot_even_for_an_untracked_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = build_harness(dir.path(), None);
    harness.accountant.register_vms(1).unwrap();
    assert_eq!(harness.accountant.current_vms().unwrap(), 1);

    harness.release_vm(VmId::new(999)).await.unwrap();
    assert_eq!(harness.accountant.current_vms().unwrap(), 0);
}

#[tokio::test]
async fn rebalance_releases_excess_vms_when_headroom_collapses_to_zero() {
    let dir = tempfile::tempdir().unwrap();
    let zero_headroom = SystemStats { cpu_percent_used: 100.0, memory_total_mb: 0.0, memory_used_mb: 0.0 };
    let mut harness = build_harness(dir.path(), Some(zero_headroom));

    let id = harness.registry.add_vm(dummy_vm_record(VmId::new(0))).unwrap();
    harness.vms.push(id);

    harness.rebalance().await.unwrap();

    assert!(harness.vms.is_empty());
    assert!(harness.registry.get(id).unwrap().is_none());
}
