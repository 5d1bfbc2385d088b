// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns the replay VM paused at reset with the debug stub attached, and
//! waits for the operator to finish an interactive debugging session
//! before cleaning up.

use crate::error::ReplayError;
use crate::reconstruct::ReplayTarget;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use vmfuzz_emulator::{DisplayMode, ShareTransport, SpawnRequest, SpawnedVm};

const DEBUG_PORT_WAIT: Duration = Duration::from_secs(10);

/// Fixed QEMU flag that freezes the vCPU at reset instead of running to
/// the loaded snapshot, so the operator attaches before any guest code
/// executes.
const PAUSE_AT_START_FLAG: &str = "-S";

#[derive(Debug, Clone)]
pub struct ReplaySpawnConfig {
    pub arch: String,
    pub share_transport: ShareTransport,
    pub display: DisplayMode,
    pub scratch_root: PathBuf,
}

/// Waits for the operator to signal that the interactive session is over.
/// Production code waits on a line from stdin; tests substitute a
/// [`tokio::sync::Notify`].
#[async_trait]
pub trait ExitWaiter: Send + Sync {
    async fn wait(&self);
}

pub struct StdinExitWaiter;

#[async_trait]
impl ExitWaiter for StdinExitWaiter {
    async fn wait(&self) {
        let _ = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)
        })
        .await;
    }
}

#[async_trait]
impl ExitWaiter for tokio::sync::Notify {
    async fn wait(&self) {
        self.notified().await;
    }
}

/// Spawns the replay VM, writes the reconstructed test case into its
/// share directory, and waits until the debug stub port is reachable.
pub async fn launch(target: &ReplayTarget, config: &ReplaySpawnConfig) -> Result<SpawnedVm, ReplayError> {
    let job_tag = target.job_id.get();
    let share_dir = config.scratch_root.join(format!("replay-job-{job_tag}")).join("share");
    std::fs::create_dir_all(&share_dir)?;

    let input_bytes = std::fs::read(&target.testcase_path)?;
    std::fs::write(share_dir.join("fuzz_input.bin"), &input_bytes)?;

    let req = SpawnRequest {
        arch: config.arch.clone(),
        disk_image: target.disk_image.clone(),
        snapshot_name: target.snapshot_name.clone(),
        share_dir,
        share_transport: config.share_transport,
        display: config.display,
        enable_time_compression: false,
        extra_args: vec![PAUSE_AT_START_FLAG.to_string()],
    };

    let mut spawned = vmfuzz_emulator::start_vm(vmfuzz_core::VmId::new(0), 1, 0, req).await?;
    spawned.record.current_job = Some(target.job_id);
    vmfuzz_debugstub::wait_for_port(spawned.record.ports.debug_stub, DEBUG_PORT_WAIT).await?;
    info!(
        debug_port = spawned.record.ports.debug_stub,
        monitor_port = spawned.record.ports.monitor,
        "replay VM paused and waiting for a debugger"
    );
    Ok(spawned)
}

/// Blocks on `waiter`, then force-stops the VM regardless of how the wait
/// resolved.
pub async fn run_interactive(mut spawned: SpawnedVm, waiter: &dyn ExitWaiter) -> Result<(), ReplayError> {
    waiter.wait().await;
    vmfuzz_emulator::stop_vm(&mut spawned.record, true).await?;
    Ok(())
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
