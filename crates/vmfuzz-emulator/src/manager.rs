// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns and supervises emulator child processes: builds the command
//! line for a given architecture and job configuration, watches for an
//! early exit that indicates a disk-only snapshot, and drives stop/revert
//! through the monitor channel.

use crate::arch::{self, ArchProfile};
use crate::error::EmulatorError;
use crate::monitor;
use crate::ports::pick_n_free_ports;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use vmfuzz_core::{VmId, VmPorts, VmRecord, VmStatus};

const DISK_ONLY_SNAPSHOT_MARKER: &str = "snapshot has no memory state";
const POST_SPAWN_SANITY_WAIT: Duration = Duration::from_secs(1);

/// Host-share transport presented to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareTransport {
    Smb,
    VirtFs,
}

/// Display mode for the spawned instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Vnc(u16),
    Nographic,
    Off,
}

#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub arch: String,
    pub disk_image: PathBuf,
    pub snapshot_name: Option<String>,
    pub share_dir: PathBuf,
    pub share_transport: ShareTransport,
    pub display: DisplayMode,
    pub enable_time_compression: bool,
    pub extra_args: Vec<String>,
}

/// An emulator instance this process just spawned: the live child handle
/// plus the record to persist in the registry.
pub struct SpawnedVm {
    pub record: VmRecord,
    pub child: Child,
}

fn build_args(req: &SpawnRequest, profile: &ArchProfile, ports: &VmPorts) -> Vec<String> {
    let mut args = vec![
        "-drive".to_string(),
        format!("file={},format=qcow2", req.disk_image.display()),
    ];

    if let Some(snapshot) = &req.snapshot_name {
        args.push("-loadvm".to_string());
        args.push(snapshot.clone());
    }

    match req.share_transport {
        ShareTransport::Smb => {
            args.push("-netdev".to_string());
            args.push(format!(
                "user,id=net0,smb={},hostfwd=tcp::{}-:4444",
                req.share_dir.display(),
                ports.guest_agent
            ));
        }
        ShareTransport::VirtFs => {
            args.push("-virtfs".to_string());
            args.push(format!(
                "local,path={},mount_tag=host_share,security_model=mapped-xattr",
                req.share_dir.display()
            ));
        }
    }

    match req.display {
        DisplayMode::Vnc(port) => {
            args.push("-vnc".to_string());
            args.push(format!("127.0.0.1:{}", port - 5900));
        }
        DisplayMode::Nographic => args.push("-nographic".to_string()),
        DisplayMode::Off => {
            args.push("-display".to_string());
            args.push("none".to_string());
        }
    }

    args.push("-monitor".to_string());
    args.push(format!("tcp:127.0.0.1:{},server,nowait", ports.monitor));

    args.push("-gdb".to_string());
    args.push(format!("tcp::{}", ports.debug_stub));

    if req.enable_time_compression {
        args.push("-icount".to_string());
        args.push("shift=auto".to_string());
    }

    let _ = profile;
    args.extend(req.extra_args.iter().cloned());
    args
}

/// Spawns the emulator process for `req`. Waits briefly and checks the
/// child hasn't exited already; a disk-only-snapshot stderr substring is
/// reported as a distinct, user-actionable error.
#[instrument(skip(req), fields(arch = %req.arch))]
pub async fn start_vm(id: VmId, max_parallel_vms: u32, running_count: u32, req: SpawnRequest) -> Result<SpawnedVm, EmulatorError> {
    if max_parallel_vms != 0 && running_count >= max_parallel_vms {
        return Err(EmulatorError::AtCapacity(max_parallel_vms));
    }

    let profile = arch::lookup(&req.arch)?;
    let vnc_port = matches!(req.display, DisplayMode::Vnc(_)).then(|| pick_n_free_ports(1)).transpose()?.map(|v| v[0]);
    let mut free_ports = pick_n_free_ports(3)?;
    let debug_stub = free_ports.remove(0);
    let monitor_port = free_ports.remove(0);
    let guest_agent = free_ports.remove(0);
    let ports = VmPorts { debug_stub, monitor: monitor_port, guest_agent, vnc: vnc_port };

    std::fs::create_dir_all(&req.share_dir)?;

    let args = build_args(&req, &profile, &ports);
    info!(binary = profile.emulator_binary, ?args, "spawning emulator");

    let mut child = Command::new(profile.emulator_binary)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(EmulatorError::Spawn)?;

    sleep(POST_SPAWN_SANITY_WAIT).await;

    if let Some(status) = child.try_wait().map_err(EmulatorError::Spawn)? {
        let stderr = read_stderr(&mut child).await;
        warn!(?status, %stderr, "emulator exited immediately after spawn");
        if let Some(snapshot) = &req.snapshot_name {
            if stderr.contains(DISK_ONLY_SNAPSHOT_MARKER) {
                return Err(EmulatorError::DiskOnlySnapshot { snapshot: snapshot.clone() });
            }
        }
        return Err(EmulatorError::ExitedImmediately { stderr });
    }

    let pid = child.id().unwrap_or(0);
    let record = VmRecord {
        id,
        pid,
        arch: req.arch,
        disk_image: req.disk_image,
        share_dir: req.share_dir,
        ports,
        snapshot_name: req.snapshot_name,
        status: VmStatus::Running,
        current_job: None,
        current_test: None,
    };

    Ok(SpawnedVm { record, child })
}

async fn read_stderr(child: &mut Child) -> String {
    use tokio::io::AsyncReadExt;
    let mut out = String::new();
    if let Some(stderr) = child.stderr.as_mut() {
        let _ = stderr.read_to_string(&mut out).await;
    }
    out
}

/// Sends SIGTERM, waits up to a second, then SIGKILL if the process is
/// still alive. When `force` is set the scratch directory is also removed.
#[instrument(skip(record))]
pub async fn stop_vm(record: &mut VmRecord, force: bool) -> Result<(), EmulatorError> {
    if record.status == VmStatus::Stopped {
        return Ok(());
    }

    send_signal(record.pid, Signal::Term);
    sleep(Duration::from_secs(1)).await;
    if pid_is_alive(record.pid) {
        send_signal(record.pid, Signal::Kill);
    }
    record.mark_stopped();

    if force {
        let _ = std::fs::remove_dir_all(&record.share_dir);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Term,
    Kill,
}

/// Sends a signal by shelling out to `kill(1)` rather than calling the
/// libc syscall directly, since the workspace forbids `unsafe` code.
fn send_signal(pid: u32, signal: Signal) {
    let flag = match signal {
        Signal::Term => "-TERM",
        Signal::Kill => "-KILL",
    };
    let _ = std::process::Command::new("kill").arg(flag).arg(pid.to_string()).status();
}

fn pid_is_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

/// Reverts `record` to its snapshot, preferring the fast monitor-based
/// path and falling back to a full respawn. Returns the spawned child
/// handle when the slow path ran (the caller must keep it alive), or
/// `None` when the fast path succeeded and the existing child is untouched.
#[instrument(skip(record, req))]
pub async fn revert_to_snapshot(record: &mut VmRecord, req: SpawnRequest) -> Result<Option<SpawnedVm>, EmulatorError> {
    let snapshot = record
        .snapshot_name
        .clone()
        .ok_or_else(|| EmulatorError::MonitorError("no snapshot configured".to_string()))?;

    match monitor::fast_revert_over_tcp(record.ports.monitor, &snapshot).await {
        Ok(()) => {
            info!(vm_id = %record.id, "fast-path snapshot revert succeeded");
            Ok(None)
        }
        Err(err) => {
            warn!(vm_id = %record.id, %err, "fast-path revert failed, falling back to slow path");
            stop_vm(record, false).await?;
            let mut slow_req = req;
            slow_req.snapshot_name = Some(snapshot);
            slow_req.extra_args.push("-S".to_string());
            let spawned = start_vm(record.id, 0, 0, slow_req).await?;
            *record = spawned.record.clone();
            Ok(Some(spawned))
        }
    }
}

/// Iterates records, marking any `Running` record whose owning process is
/// no longer alive as `Stopped`.
pub fn status_refresh(records: &mut [VmRecord]) {
    for record in records.iter_mut() {
        if record.status == VmStatus::Running && !pid_is_alive(record.pid) {
            record.mark_stopped();
        }
    }
}

pub async fn screenshot(record: &VmRecord, dest: &Path) -> Result<Vec<u8>, EmulatorError> {
    monitor::screenshot_over_tcp(record.ports.monitor, dest).await
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
