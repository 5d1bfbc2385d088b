// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

async fn spawn_fake_agent(response: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "GET_CRASH\n");
        write_half.write_all(response.as_bytes()).await.unwrap();
    });
    port
}

#[tokio::test]
async fn poll_once_parses_crash_report() {
    let port = spawn_fake_agent("{\"crash\": true, \"pid\": 42, \"exe\": \"/bin/app\", \"exception\": \"SIGSEGV\", \"file\": \"app.c\"}\n").await;
    let report = poll_once(port).await;
    assert!(report.crash);
    assert_eq!(report.pid, Some(42));
    assert_eq!(report.exe.as_deref(), Some("/bin/app"));
}

#[tokio::test]
async fn poll_once_parses_no_crash_report() {
    let port = spawn_fake_agent("{\"crash\": false}\n").await;
    let report = poll_once(port).await;
    assert!(!report.crash);
}

#[tokio::test]
async fn poll_once_degrades_to_no_crash_on_connection_failure() {
    // Nothing listening on this port.
    let report = poll_once(1).await;
    assert!(!report.crash);
}
