// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side dispatch server: accepts connections on the well-known
//! dispatch port, authenticates and dispatches each envelope, and hands
//! `PUSH_JOB` off to an injected [`JobLauncher`].

use crate::archive;
use crate::auth::ApiKeyStore;
use crate::envelope::{self, Envelope, DEFAULT_TIMEOUT};
use crate::error::DispatchError;
use crate::launcher::{JobLauncher, LaunchRequest};
use crate::tls::load_or_generate_cert;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{error, info, warn};
use vmfuzz_core::JobStatus;
use vmfuzz_store::Store;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub bind_addr: String,
    pub job_root: PathBuf,
    pub tls_enabled: bool,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Live job statuses this worker reports on `STATUS_REQUEST`. A real
/// harness updates this map as jobs progress; the dispatch server only
/// reads it.
#[derive(Clone, Default)]
pub struct JobStatusTable {
    inner: Arc<parking_lot::RwLock<HashMap<i64, JobStatus>>>,
}

impl JobStatusTable {
    pub fn set(&self, job_id: i64, status: JobStatus) {
        self.inner.write().insert(job_id, status);
    }

    pub fn snapshot(&self) -> HashMap<i64, JobStatus> {
        self.inner.read().clone()
    }
}

pub struct Worker {
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    auth: Arc<ApiKeyStore>,
    job_root: PathBuf,
    launcher: Arc<dyn JobLauncher>,
    statuses: JobStatusTable,
    store: Arc<Store>,
}

impl Worker {
    pub async fn bind(
        config: WorkerConfig,
        auth: ApiKeyStore,
        launcher: Arc<dyn JobLauncher>,
        statuses: JobStatusTable,
        store: Arc<Store>,
    ) -> Result<Self, DispatchError> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        let acceptor = if config.tls_enabled {
            let (cert_pem, key_pem) = load_or_generate_cert(&config.cert_path, &config.key_path, &config.bind_addr)?;
            Some(crate::tls::build_acceptor(&cert_pem, &key_pem)?)
        } else {
            None
        };
        Ok(Self {
            listener,
            acceptor,
            auth: Arc::new(auth),
            job_root: config.job_root,
            launcher,
            statuses,
            store,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` fires, spawning one task per
    /// connection so a slow peer can't stall new arrivals. Polls the accept
    /// future against the shutdown signal with a 1s timeout, matching the
    /// accept-loop cancellation granularity used elsewhere in this system.
    pub async fn run(self, shutdown: Arc<tokio::sync::Notify>) {
        let this = Arc::new(self);
        loop {
            let accepted = tokio::select! {
                accepted = this.listener.accept() => accepted,
                _ = shutdown.notified() => break,
            };
            match accepted {
                Ok((stream, peer)) => {
                    let this = Arc::clone(&this);
                    tokio::spawn(async move {
                        if let Err(err) = this.handle_connection(stream).await {
                            warn!(%peer, %err, "dispatch connection failed");
                        }
                    });
                }
                Err(err) => error!(%err, "accept failed"),
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream) -> Result<(), DispatchError> {
        match &self.acceptor {
            Some(acceptor) => {
                let tls = acceptor.accept(stream).await.map_err(|e| DispatchError::Tls(e.to_string()))?;
                self.serve(tls).await
            }
            None => self.serve(stream).await,
        }
    }

    async fn serve<S: AsyncRead + AsyncWrite + Unpin>(&self, mut stream: S) -> Result<(), DispatchError> {
        let request = envelope::read_envelope_timeout(&mut stream, DEFAULT_TIMEOUT).await?;

        if !self.auth.authenticate(request.auth()) {
            warn!(kind = request.kind(), "rejecting unauthenticated request");
            envelope::write_envelope(&mut stream, &Envelope::Error { message: "authentication failed".to_string() }).await?;
            return Err(DispatchError::AuthFailed);
        }

        match request {
            Envelope::PushJob { job_id, config, package_size, .. } => {
                self.handle_push_job(&mut stream, job_id, config, package_size).await
            }
            Envelope::StatusRequest { .. } => {
                let jobs = self
                    .statuses
                    .snapshot()
                    .into_iter()
                    .map(|(id, status)| (id.to_string(), status.to_string()))
                    .collect();
                envelope::write_envelope(&mut stream, &Envelope::StatusResponse { jobs }).await
            }
            Envelope::CrashRequest { job_id, .. } => {
                let crashes = self
                    .store
                    .list_crashes_for_job(vmfuzz_core::JobId::new(job_id))?
                    .into_iter()
                    .map(|c| serde_json::to_value(c).unwrap_or(serde_json::Value::Null))
                    .collect();
                envelope::write_envelope(&mut stream, &Envelope::CrashResponse { crashes }).await
            }
            other => {
                let message = format!("worker does not accept {} requests", other.kind());
                envelope::write_envelope(&mut stream, &Envelope::Error { message: message.clone() }).await?;
                Err(DispatchError::UnexpectedEnvelope { expected: "PUSH_JOB|STATUS_REQUEST|CRASH_REQUEST", got: other.kind().to_string() })
            }
        }
    }

    async fn handle_push_job<S: AsyncRead + AsyncWrite + Unpin>(
        &self,
        stream: &mut S,
        job_id: i64,
        config: serde_json::Value,
        package_size: u64,
    ) -> Result<(), DispatchError> {
        let job_dir = self.job_root.join(format!("job-{job_id}"));
        std::fs::create_dir_all(&job_dir)?;
        let archive_path = job_dir.join("incoming.tar.gz");

        let mut file = tokio::fs::File::create(&archive_path).await?;
        let mut remaining = package_size;
        let mut buf = vec![0u8; 64 * 1024];
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            tokio::io::AsyncReadExt::read_exact(stream, &mut buf[..chunk]).await?;
            tokio::io::AsyncWriteExt::write_all(&mut file, &buf[..chunk]).await?;
            remaining -= chunk as u64;
        }
        file.flush().await?;

        let (disk_image, corpus_dir) = archive::unpack_job_archive(&archive_path, &job_dir)?;
        self.statuses.set(job_id, JobStatus::Pending);

        let request = LaunchRequest { job_id, job_dir: job_dir.clone(), disk_image, corpus_dir, config };
        self.launcher.launch(request).await?;
        self.statuses.set(job_id, JobStatus::Running);
        info!(job_id, "job launched");

        envelope::write_envelope(stream, &Envelope::Ack).await
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
