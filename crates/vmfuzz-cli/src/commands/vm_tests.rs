// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use vmfuzz_core::{VmPorts, VmRecord, VmStatus};

fn ctx_in(dir: &std::path::Path) -> Context {
    Context::load(dir.to_path_buf()).unwrap()
}

fn sample_record(id: i64) -> VmRecord {
    VmRecord {
        id: VmId::new(id),
        pid: 999_999,
        arch: "x86_64".to_string(),
        disk_image: "/images/target.qcow2".into(),
        share_dir: "/tmp/does-not-exist".into(),
        ports: VmPorts { debug_stub: 1234, monitor: 1235, guest_agent: 1236, vnc: None },
        snapshot_name: Some("clean".to_string()),
        status: VmStatus::Stopped,
        current_job: None,
        current_test: None,
    }
}

#[test]
fn list_prints_every_registered_vm_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_in(dir.path());
    let registry = Registry::new(&ctx.state_dir);
    registry.add_vm(sample_record(1)).unwrap();
    registry.add_vm(sample_record(2)).unwrap();

    assert!(list(&ctx).is_ok());
    assert_eq!(registry.list().unwrap().len(), 2);
}

#[tokio::test]
async fn stop_on_missing_vm_errors() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_in(dir.path());

    let err = stop(&ctx, 7, false).await.unwrap_err();
    assert!(matches!(err, CliError::VmNotFound(7)));
}

#[tokio::test]
async fn screenshot_on_missing_vm_errors() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_in(dir.path());
    let dest = dir.path().join("shot.png");

    let err = screenshot(&ctx, 3, &dest).await.unwrap_err();
    assert!(matches!(err, CliError::VmNotFound(3)));
}
