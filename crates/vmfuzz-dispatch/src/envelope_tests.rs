// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn write_then_read_round_trips_a_push_job_envelope() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    let sent = Envelope::PushJob {
        job_id: 7,
        config: serde_json::json!({"name": "nightly"}),
        package_size: 4096,
        auth: Some(AuthHeader { method: AuthMethod::ApiKey, key: "secret".to_string() }),
    };
    write_envelope(&mut client, &sent).await.unwrap();
    let received = read_envelope(&mut server).await.unwrap();

    assert_eq!(received.kind(), "PUSH_JOB");
    match received {
        Envelope::PushJob { job_id, package_size, auth, .. } => {
            assert_eq!(job_id, 7);
            assert_eq!(package_size, 4096);
            assert_eq!(auth.unwrap().key, "secret");
        }
        other => panic!("unexpected envelope: {other:?}"),
    }
}

#[tokio::test]
async fn read_envelope_reports_connection_closed_on_immediate_eof() {
    let (client, mut server) = tokio::io::duplex(4096);
    drop(client);
    let err = read_envelope(&mut server).await.unwrap_err();
    assert!(matches!(err, DispatchError::ConnectionClosed));
}

#[tokio::test]
async fn read_envelope_rejects_a_length_prefix_over_the_limit() {
    let (mut client, mut server) = tokio::io::duplex(8);
    client.write_all(&(MAX_ENVELOPE_SIZE + 1).to_be_bytes()).await.unwrap();
    let err = read_envelope(&mut server).await.unwrap_err();
    assert!(matches!(err, DispatchError::EnvelopeTooLarge { .. }));
}

#[tokio::test]
async fn read_envelope_timeout_fires_when_nothing_arrives() {
    let (_client, mut server) = tokio::io::duplex(8);
    let err = read_envelope_timeout(&mut server, std::time::Duration::from_millis(20)).await.unwrap_err();
    assert!(matches!(err, DispatchError::Timeout(_)));
}

#[test]
fn status_request_auth_is_reachable_through_the_enum_helper() {
    let env = Envelope::StatusRequest { auth: None };
    assert_eq!(env.kind(), "STATUS_REQUEST");
    assert!(env.auth().is_none());
}
