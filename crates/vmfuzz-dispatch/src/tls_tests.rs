// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::rustls::pki_types::ServerName;

#[test]
fn load_or_generate_cert_writes_a_pair_and_reuses_it_next_time() {
    let dir = tempfile::tempdir().unwrap();
    let cert_path = dir.path().join("worker.crt");
    let key_path = dir.path().join("worker.key");

    let (first_cert, first_key) = load_or_generate_cert(&cert_path, &key_path, "worker.local").unwrap();
    assert!(cert_path.exists());
    assert!(key_path.exists());

    let (second_cert, second_key) = load_or_generate_cert(&cert_path, &key_path, "worker.local").unwrap();
    assert_eq!(first_cert, second_cert);
    assert_eq!(first_key, second_key);
}

#[tokio::test]
async fn a_client_using_the_trust_any_connector_completes_a_handshake_against_a_self_signed_server() {
    let dir = tempfile::tempdir().unwrap();
    let (cert_pem, key_pem) = load_or_generate_cert(&dir.path().join("a.crt"), &dir.path().join("a.key"), "127.0.0.1").unwrap();
    let acceptor = build_acceptor(&cert_pem, &key_pem).unwrap();
    let connector = build_connector();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut tls = acceptor.accept(stream).await.unwrap();
        let mut buf = [0u8; 5];
        tls.read_exact(&mut buf).await.unwrap();
        tls.write_all(&buf).await.unwrap();
    });

    let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let domain = ServerName::try_from("127.0.0.1").unwrap();
    let mut tls = connector.connect(domain, stream).await.unwrap();
    tls.write_all(b"hello").await.unwrap();
    let mut echoed = [0u8; 5];
    tls.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"hello");

    server.await.unwrap();
}
