// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TLS for the dispatch transport. A worker and its controller share no
//! common certificate authority, so trust is established out of band (the
//! API key, if enabled) and TLS here buys transport encryption, not peer
//! identity. A missing certificate pair is generated self-signed on first
//! use; both sides log a warning rather than silently trusting it.

use crate::error::DispatchError;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, ServerConfig, SignatureScheme};
use tokio_rustls::{TlsAcceptor, TlsConnector};
use tracing::warn;

/// Reads `cert_path`/`key_path` if both exist; otherwise generates a
/// self-signed pair for `subject` and writes them out for next time.
pub fn load_or_generate_cert(cert_path: &Path, key_path: &Path, subject: &str) -> Result<(String, String), DispatchError> {
    if cert_path.exists() && key_path.exists() {
        let cert_pem = std::fs::read_to_string(cert_path)?;
        let key_pem = std::fs::read_to_string(key_path)?;
        return Ok((cert_pem, key_pem));
    }

    warn!(%subject, "no certificate pair found, generating a self-signed one");
    let certified = rcgen::generate_simple_self_signed(vec![subject.to_string()])
        .map_err(|e| DispatchError::Tls(e.to_string()))?;
    let cert_pem = certified.cert.pem();
    let key_pem = certified.key_pair.serialize_pem();

    if let Some(parent) = cert_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(cert_path, &cert_pem)?;
    std::fs::write(key_path, &key_pem)?;
    Ok((cert_pem, key_pem))
}

fn parse_cert_chain(cert_pem: &str) -> Result<Vec<CertificateDer<'static>>, DispatchError> {
    let mut reader = std::io::BufReader::new(cert_pem.as_bytes());
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DispatchError::Tls(e.to_string()))
}

fn parse_private_key(key_pem: &str) -> Result<PrivateKeyDer<'static>, DispatchError> {
    let mut reader = std::io::BufReader::new(key_pem.as_bytes());
    let mut keys = rustls_pemfile::pkcs8_private_keys(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DispatchError::Tls(e.to_string()))?;
    let key = keys.pop().ok_or_else(|| DispatchError::Tls("no PKCS#8 private key found in PEM".to_string()))?;
    Ok(PrivateKeyDer::Pkcs8(key))
}

/// Builds a worker-side TLS acceptor from a PEM certificate/key pair.
pub fn build_acceptor(cert_pem: &str, key_pem: &str) -> Result<TlsAcceptor, DispatchError> {
    let chain = parse_cert_chain(cert_pem)?;
    let key = parse_private_key(key_pem)?;
    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .map_err(|e| DispatchError::Tls(e.to_string()))?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Builds a controller-side TLS connector that trusts whatever certificate
/// the worker presents, since peer identity is established by API key
/// (when enabled) rather than by a shared CA.
pub fn build_connector() -> TlsConnector {
    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(TrustAnyCertificate))
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

#[derive(Debug)]
struct TrustAnyCertificate;

impl tokio_rustls::rustls::client::danger::ServerCertVerifier for TrustAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<tokio_rustls::rustls::client::danger::ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(tokio_rustls::rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<tokio_rustls::rustls::client::danger::HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<tokio_rustls::rustls::client::danger::HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ED25519,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
        ]
    }
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tests;
