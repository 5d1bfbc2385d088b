// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use vmfuzz_core::{JobId, VmPorts, VmStatus};

fn record(id: i64) -> VmRecord {
    VmRecord {
        id: VmId::new(id),
        pid: 1000 + id as u32,
        arch: "x86_64".to_string(),
        disk_image: PathBuf::from("/images/target.qcow2"),
        share_dir: PathBuf::from(format!("/tmp/vmfuzz/vm-{id}/share")),
        ports: VmPorts {
            debug_stub: 1234,
            monitor: 1235,
            guest_agent: 1236,
            vnc: None,
        },
        snapshot_name: Some("clean".to_string()),
        status: VmStatus::Running,
        current_job: Some(JobId::new(1)),
        current_test: None,
    }
}

use std::path::PathBuf;

#[test]
fn add_vm_allocates_strictly_increasing_ids() {
    let dir = tempdir().unwrap();
    let registry = Registry::new(dir.path());
    let id1 = registry.add_vm(record(0)).unwrap();
    let id2 = registry.add_vm(record(0)).unwrap();
    assert_eq!(id1.get(), 1);
    assert_eq!(id2.get(), 2);
}

#[test]
fn last_vm_id_survives_a_fresh_registry_handle() {
    let dir = tempdir().unwrap();
    {
        let registry = Registry::new(dir.path());
        registry.add_vm(record(0)).unwrap();
        registry.add_vm(record(0)).unwrap();
    }
    let registry = Registry::new(dir.path());
    let id3 = registry.add_vm(record(0)).unwrap();
    assert_eq!(id3.get(), 3);
}

#[test]
fn remove_vm_is_noop_when_absent() {
    let dir = tempdir().unwrap();
    let registry = Registry::new(dir.path());
    registry.remove_vm(VmId::new(99)).unwrap();
    assert!(registry.list().unwrap().is_empty());
}

#[test]
fn list_excludes_the_last_vm_id_marker() {
    let dir = tempdir().unwrap();
    let registry = Registry::new(dir.path());
    registry.add_vm(record(0)).unwrap();
    let all = registry.list().unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
fn update_vm_persists_status_changes() {
    let dir = tempdir().unwrap();
    let registry = Registry::new(dir.path());
    let id = registry.add_vm(record(0)).unwrap();
    let mut rec = registry.get(id).unwrap().unwrap();
    rec.mark_stopped();
    registry.update_vm(&rec).unwrap();
    assert_eq!(registry.get(id).unwrap().unwrap().status, VmStatus::Stopped);
}
