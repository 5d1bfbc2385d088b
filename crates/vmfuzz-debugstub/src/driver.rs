// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drives one debug session: launches the host debugger in batch mode
//! against the VM's debug stub while polling the guest agent in parallel,
//! and reconciles whichever of the two reports a crash first.

use crate::agent_client::{self, GuestCrashReport};
use crate::backtrace::{extract_signal, parse_backtrace};
use crate::error::DebugStubError;
use crate::script::write_script;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::{interval, sleep, timeout};
use tracing::instrument;
use vmfuzz_core::StackFrame;
use vmfuzz_emulator::ArchProfile;

const AGENT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const PORT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub enum DebugOutcome {
    NoCrash,
    Kernel { signal: String, frames: Vec<StackFrame>, raw_output: String },
    User(GuestCrashReport),
}

/// Polls `127.0.0.1:port` until a connection succeeds or `deadline` elapses,
/// because the emulator opens the debug-stub port lazily after spawn.
#[instrument]
pub async fn wait_for_port(port: u16, deadline: Duration) -> Result<(), DebugStubError> {
    let start = tokio::time::Instant::now();
    loop {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Ok(());
        }
        if start.elapsed() >= deadline {
            return Err(DebugStubError::PortNeverOpened(port));
        }
        sleep(PORT_POLL_INTERVAL).await;
    }
}

/// Runs one debug session: launches the debugger, polls the guest agent,
/// and returns as soon as either side reports a crash or `session_timeout`
/// elapses with neither.
#[instrument(skip(profile))]
pub async fn run_session(
    profile: &ArchProfile,
    debug_port: u16,
    agent_port: u16,
    session_timeout: Duration,
) -> Result<DebugOutcome, DebugStubError> {
    wait_for_port(debug_port, Duration::from_secs(10)).await?;

    let script_path = write_script(profile, debug_port)?;
    let mut child = Command::new("gdb")
        .arg("-batch")
        .arg("-x")
        .arg(&script_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(DebugStubError::Launch)?;

    let mut agent_ticker = interval(AGENT_POLL_INTERVAL);
    let outcome = timeout(session_timeout, async {
        loop {
            tokio::select! {
                status = child.wait() => {
                    let _ = status;
                    break collect_kernel_outcome(&mut child).await;
                }
                _ = agent_ticker.tick() => {
                    let report = agent_client::poll_once(agent_port).await;
                    if report.crash {
                        let _ = child.kill().await;
                        break DebugOutcome::User(report);
                    }
                }
            }
        }
    })
    .await;

    let _ = std::fs::remove_file(&script_path);

    match outcome {
        Ok(outcome) => Ok(outcome),
        Err(_elapsed) => {
            let _ = child.kill().await;
            Ok(DebugOutcome::NoCrash)
        }
    }
}

async fn collect_kernel_outcome(child: &mut tokio::process::Child) -> DebugOutcome {
    use tokio::io::AsyncReadExt;
    let mut combined = String::new();
    if let Some(stdout) = child.stdout.as_mut() {
        let _ = stdout.read_to_string(&mut combined).await;
    }
    if let Some(stderr) = child.stderr.as_mut() {
        let mut err = String::new();
        let _ = stderr.read_to_string(&mut err).await;
        combined.push_str(&err);
    }

    match extract_signal(&combined) {
        Some(signal) => DebugOutcome::Kernel { signal, frames: parse_backtrace(&combined), raw_output: combined },
        None => DebugOutcome::NoCrash,
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
