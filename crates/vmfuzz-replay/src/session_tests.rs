use super::*;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use vmfuzz_core::{VmId, VmPorts, VmStatus};

async fn spawn_dummy_vm() -> SpawnedVm {
    let child = Command::new("sleep")
        .arg("30")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let pid = child.id().unwrap();
    let record = vmfuzz_core::VmRecord {
        id: VmId::new(1),
        pid,
        arch: "x86_64".to_string(),
        disk_image: PathBuf::from("/images/target.qcow2"),
        share_dir: std::env::temp_dir().join(format!("replay-session-test-{pid}")),
        ports: VmPorts { debug_stub: 1234, monitor: 1235, guest_agent: 1236, vnc: None },
        snapshot_name: Some("clean".to_string()),
        status: VmStatus::Running,
        current_job: None,
        current_test: None,
    };
    SpawnedVm { record, child }
}

#[tokio::test]
async fn run_interactive_stops_the_vm_once_the_waiter_resolves() {
    let spawned = spawn_dummy_vm().await;
    let notify = Arc::new(tokio::sync::Notify::new());
    notify.notify_one();

    run_interactive(spawned, notify.as_ref()).await.unwrap();
}

#[tokio::test]
async fn launch_writes_the_testcase_into_the_share_directory_before_spawning() {
    let root = tempfile::tempdir().unwrap();
    let testcase_path = root.path().join("crashing_input.bin");
    std::fs::write(&testcase_path, b"PAYLOAD").unwrap();

    let target = ReplayTarget {
        job_id: vmfuzz_core::JobId::new(1),
        crash_id: None,
        disk_image: PathBuf::from("/images/target.qcow2"),
        snapshot_name: Some("clean".to_string()),
        testcase_path,
    };
    let config = ReplaySpawnConfig {
        arch: "x86_64".to_string(),
        share_transport: ShareTransport::Smb,
        display: DisplayMode::Off,
        scratch_root: root.path().to_path_buf(),
    };

    // No real emulator binary is available in this environment, so the
    // spawn itself fails; what this test actually pins down is that the
    // share directory and fuzz_input.bin are written before that happens.
    let _ = launch(&target, &config).await;

    let share_dir = root.path().join("replay-job-1").join("share");
    assert_eq!(std::fs::read(share_dir.join("fuzz_input.bin")).unwrap(), b"PAYLOAD");
}
