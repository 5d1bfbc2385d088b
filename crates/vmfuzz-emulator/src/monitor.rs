// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The emulator monitor protocol: a line-oriented administrative channel
//! used for `stop`, `loadvm`, `cont`, and `screendump`. Generic over any
//! `AsyncRead + AsyncWrite` stream so the fast-revert and screenshot logic
//! can be exercised in tests against an in-memory duplex pair instead of a
//! real emulator.

use crate::error::EmulatorError;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const BANNER_DRAIN: Duration = Duration::from_millis(100);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
const LOADVM_SETTLE: Duration = Duration::from_millis(200);

async fn drain_banner<S: AsyncRead + Unpin>(stream: &mut S) {
    let mut buf = [0u8; 4096];
    let _ = timeout(BANNER_DRAIN, stream.read(&mut buf)).await;
}

async fn send_command<S: AsyncWrite + Unpin>(stream: &mut S, cmd: &str) -> Result<(), EmulatorError> {
    timeout(COMMAND_TIMEOUT, stream.write_all(format!("{cmd}\n").as_bytes()))
        .await
        .map_err(|_| EmulatorError::MonitorTimeout)?
        .map_err(EmulatorError::Io)
}

async fn read_response<S: AsyncRead + Unpin>(stream: &mut S) -> Result<String, EmulatorError> {
    let mut buf = [0u8; 4096];
    let n = timeout(COMMAND_TIMEOUT, stream.read(&mut buf))
        .await
        .map_err(|_| EmulatorError::MonitorTimeout)?
        .map_err(EmulatorError::Io)?;
    Ok(String::from_utf8_lossy(&buf[..n]).to_string())
}

fn response_is_error(response: &str) -> bool {
    let lower = response.to_ascii_lowercase();
    lower.contains("error") || lower.contains("unknown")
}

/// Attempts a fast-path snapshot revert over an already-connected monitor
/// stream: `stop`, `loadvm <name>`, a short settle, then `cont`. Returns
/// `Ok(())` only when the post-`loadvm` response contains no error keyword.
pub async fn fast_revert<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    snapshot: &str,
) -> Result<(), EmulatorError> {
    drain_banner(stream).await;
    send_command(stream, "stop").await?;
    send_command(stream, &format!("loadvm {snapshot}")).await?;
    tokio::time::sleep(LOADVM_SETTLE).await;
    let response = read_response(stream).await?;
    if response_is_error(&response) {
        return Err(EmulatorError::MonitorError(response));
    }
    send_command(stream, "cont").await?;
    Ok(())
}

/// Connects to `127.0.0.1:port` and runs [`fast_revert`]. Any connection
/// failure is treated as a fast-path failure so the caller falls through to
/// the slow path.
pub async fn fast_revert_over_tcp(port: u16, snapshot: &str) -> Result<(), EmulatorError> {
    let mut stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .map_err(EmulatorError::MonitorConnect)?;
    fast_revert(&mut stream, snapshot).await
}

/// Sends `screendump <path>`, waits for the emulator to flush the file,
/// then reads the raw PPM bytes back from disk. PNG re-encoding is
/// intentionally not performed here.
pub async fn screenshot_over_tcp(port: u16, dest: &std::path::Path) -> Result<Vec<u8>, EmulatorError> {
    let mut stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .map_err(EmulatorError::MonitorConnect)?;
    drain_banner(&mut stream).await;
    send_command(&mut stream, &format!("screendump {}", dest.display())).await?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    tokio::fs::read(dest).await.map_err(EmulatorError::Io)
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
