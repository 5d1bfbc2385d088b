// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::test]
async fn wait_for_port_succeeds_once_a_listener_is_up() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    // Keep the listener alive across the await point.
    let _keep_alive = tokio::spawn(async move {
        let _ = listener.accept().await;
    });
    wait_for_port(port, Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn wait_for_port_times_out_when_nothing_listens() {
    // A port in the dynamic range almost certainly unbound in CI.
    let result = wait_for_port(59213, Duration::from_millis(300)).await;
    assert!(matches!(result, Err(DebugStubError::PortNeverOpened(59213))));
}

#[tokio::test]
async fn collect_kernel_outcome_extracts_signal_and_frames() {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg("echo 'Program received signal SIGSEGV, Segmentation fault.'; echo '#0  0x0000000000401196 in memcpy () at string.c:42'")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.wait().await.unwrap();

    let outcome = collect_kernel_outcome(&mut child).await;
    match outcome {
        DebugOutcome::Kernel { signal, frames, .. } => {
            assert_eq!(signal, "SIGSEGV");
            assert_eq!(frames.len(), 1);
        }
        other => panic!("expected a kernel outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn collect_kernel_outcome_is_no_crash_without_a_signal_line() {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg("echo 'clean exit'")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.wait().await.unwrap();

    let outcome = collect_kernel_outcome(&mut child).await;
    assert_eq!(outcome, DebugOutcome::NoCrash);
}
