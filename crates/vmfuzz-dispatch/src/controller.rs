// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller side: polls a job-submission directory, inserts each
//! definition into the store, picks an idle worker, and pushes the job
//! over the dispatch wire.

use crate::archive::pack_job_archive;
use crate::envelope::{self, AuthHeader, AuthMethod, Envelope, DEFAULT_TIMEOUT};
use crate::error::DispatchError;
use crate::worker_table::{WorkerStatus, WorkerTable};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{info, warn};
use vmfuzz_core::{Clock, Job, JobConfig, JobId};
use vmfuzz_store::Store;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Directory polled for `<job>.json` submission files.
    pub submission_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub poll_interval: Duration,
    pub tls_enabled: bool,
    pub api_key: Option<String>,
}

/// A job definition dropped into the submission directory: the `JobConfig`
/// (whose `disk_image` is a local path at submission time) plus the seed
/// corpus directory the controller packages alongside it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct JobSubmission {
    #[serde(flatten)]
    pub config: JobConfig,
    pub corpus_dir: PathBuf,
}

pub struct Controller {
    config: ControllerConfig,
    workers: Arc<WorkerTable>,
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    connector: Option<TlsConnector>,
    next_job_id: AtomicI64,
}

impl Controller {
    pub fn new(config: ControllerConfig, workers: Arc<WorkerTable>, store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        let connector = config.tls_enabled.then(crate::tls::build_connector);
        Self { config, workers, store, clock, connector, next_job_id: AtomicI64::new(1) }
    }

    fn alloc_job_id(&self) -> JobId {
        JobId::new(self.next_job_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Runs one poll cycle: every `<name>.json` submission gets inserted
    /// into the store, and — if a worker is idle — pushed immediately. A
    /// submission left unpushed because the fleet is busy is retried on
    /// the next cycle, so its file is only removed once `push_job` acks.
    pub async fn poll_once(&self) -> Result<(), DispatchError> {
        let Ok(entries) = std::fs::read_dir(&self.config.submission_dir) else {
            return Ok(());
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            self.process_submission(&path).await?;
        }
        Ok(())
    }

    async fn process_submission(&self, path: &std::path::Path) -> Result<(), DispatchError> {
        let bytes = std::fs::read(path)?;
        let submission: JobSubmission = serde_json::from_slice(&bytes)?;

        let Some((worker_id, address)) = self.workers.pick_idle() else {
            warn!(path = %path.display(), "no idle worker, leaving submission for the next cycle");
            return Ok(());
        };

        let job_id = self.alloc_job_id();
        let job = Job::new(job_id, submission.config.clone(), self.clock.as_ref());
        self.store.insert_job(&job)?;

        self.workers.set_status(&worker_id, WorkerStatus::Busy);
        match self
            .push_job(&address, job_id.get(), &submission.config, &submission.config.disk_image, &submission.corpus_dir)
            .await
        {
            Ok(()) => {
                std::fs::remove_file(path)?;
                info!(job_id = job_id.get(), worker = %worker_id, "job pushed");
            }
            Err(err) => {
                self.workers.mark_offline(&worker_id);
                warn!(job_id = job_id.get(), worker = %worker_id, %err, "push_job failed, marking worker offline");
            }
        }
        Ok(())
    }

    /// Packages `disk_image`/`corpus_dir` and ships them to `worker_addr`.
    pub async fn push_job(
        &self,
        worker_addr: &str,
        job_id: i64,
        config: &JobConfig,
        disk_image: &std::path::Path,
        corpus_dir: &std::path::Path,
    ) -> Result<(), DispatchError> {
        let (archive_path, package_size) = pack_job_archive(&self.config.staging_dir, job_id, disk_image, corpus_dir)?;
        let archive_bytes = std::fs::read(&archive_path)?;

        let stream = TcpStream::connect(worker_addr).await?;
        let auth = self.config.api_key.clone().map(|key| AuthHeader { method: AuthMethod::ApiKey, key });
        let envelope = Envelope::PushJob {
            job_id,
            config: serde_json::to_value(config).unwrap_or(serde_json::Value::Null),
            package_size,
            auth,
        };

        match &self.connector {
            Some(connector) => {
                let domain = tokio_rustls::rustls::pki_types::ServerName::try_from(host_of(worker_addr).to_string())
                    .map_err(|e| DispatchError::Tls(e.to_string()))?;
                let mut tls = connector.connect(domain, stream).await.map_err(|e| DispatchError::Tls(e.to_string()))?;
                self.send_and_await_ack(&mut tls, &envelope, &archive_bytes).await
            }
            None => {
                let mut stream = stream;
                self.send_and_await_ack(&mut stream, &envelope, &archive_bytes).await
            }
        }
    }

    async fn send_and_await_ack<S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin>(
        &self,
        stream: &mut S,
        envelope: &Envelope,
        archive_bytes: &[u8],
    ) -> Result<(), DispatchError> {
        envelope::write_envelope(stream, envelope).await?;
        tokio::io::AsyncWriteExt::write_all(stream, archive_bytes).await?;

        match envelope::read_envelope_timeout(stream, DEFAULT_TIMEOUT).await? {
            Envelope::Ack => Ok(()),
            Envelope::Error { message } => Err(DispatchError::Tls(message)),
            other => Err(DispatchError::UnexpectedEnvelope { expected: "ACK", got: other.kind().to_string() }),
        }
    }

    /// Polls until `shutdown` fires.
    pub async fn run(self: Arc<Self>, shutdown: Arc<tokio::sync::Notify>) {
        loop {
            if let Err(err) = self.poll_once().await {
                warn!(%err, "poll cycle failed");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.notified() => break,
            }
        }
    }
}

/// Strips a `:port` suffix so a `ServerName` can be built from a `host:port`
/// dispatch address.
fn host_of(addr: &str) -> &str {
    addr.rsplit_once(':').map(|(host, _)| host).unwrap_or(addr)
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
