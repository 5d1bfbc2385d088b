// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Guest-agent client: a tiny line-oriented request/response protocol
//! polled over a forwarded TCP port to catch user-space crashes the debug
//! stub alone wouldn't see (the guest agent runs inside the VM and reports
//! independently of any kernel-level signal).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuestCrashReport {
    pub crash: bool,
    pub pid: Option<u32>,
    pub exe: Option<String>,
    pub exception: Option<String>,
    pub file: Option<String>,
}

impl GuestCrashReport {
    pub fn no_crash() -> Self {
        Self { crash: false, pid: None, exe: None, exception: None, file: None }
    }
}

const AGENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connects to `127.0.0.1:port`, sends `GET_CRASH\n`, and parses the
/// single JSON response line. Any socket or parse failure degrades to
/// `{crash: false}` rather than propagating, matching the polling
/// contract: a transient failure should not abort the debug session.
pub async fn poll_once(port: u16) -> GuestCrashReport {
    match poll_once_fallible(port).await {
        Ok(report) => report,
        Err(err) => {
            debug!(%err, "guest-agent poll failed, treating as no crash");
            GuestCrashReport::no_crash()
        }
    }
}

async fn poll_once_fallible(port: u16) -> Result<GuestCrashReport, std::io::Error> {
    let stream = timeout(AGENT_TIMEOUT, TcpStream::connect(("127.0.0.1", port))).await??;
    let (read_half, mut write_half) = stream.into_split();
    timeout(AGENT_TIMEOUT, write_half.write_all(b"GET_CRASH\n")).await??;

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    timeout(AGENT_TIMEOUT, reader.read_line(&mut line)).await??;

    serde_json::from_str(line.trim())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
#[path = "agent_client_tests.rs"]
mod tests;
