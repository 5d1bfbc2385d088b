// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vmfuzzctl worker serve` — the worker-mode dispatch listener, wired to
//! a [`vmfuzz_harness::Harness`] launched in the background for every
//! `PUSH_JOB` the dispatch server accepts.

use crate::context::Context;
use crate::error::CliError;
use async_trait::async_trait;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use vmfuzz_config::{AccountantPolicy, LinuxSystemStatsSampler, Registry, ResourceAccountant, SystemStatsSampler};
use vmfuzz_core::{Clock, Job, JobConfig, JobId, SystemClock};
use vmfuzz_dispatch::{ApiKeyStore, DispatchError, JobLauncher, JobStatusTable, LaunchRequest, Worker, WorkerConfig};
use vmfuzz_emulator::{DisplayMode, ShareTransport};
use vmfuzz_harness::{Harness, HarnessConfig};
use vmfuzz_store::Store;

#[derive(Args)]
pub struct WorkerArgs {
    /// Address to bind the dispatch listener on, `host:port`.
    #[arg(long)]
    pub bind: Option<String>,
}

struct HarnessLauncher {
    ctx_state_dir: std::path::PathBuf,
    config: vmfuzz_config::Config,
    store: Arc<Store>,
    statuses: JobStatusTable,
}

#[async_trait]
impl JobLauncher for HarnessLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<(), DispatchError> {
        let job_config = JobConfig {
            name: format!("job-{}", request.job_id),
            disk_image: request.disk_image,
            snapshot_name: self.config.snapshot_name.clone(),
            fuzzer_kind: self.config.fuzzer.clone(),
            fuzzer_config: request.config,
        };
        let job = Job::new(JobId::new(request.job_id), job_config, &SystemClock);
        self.store.insert_job(&job)?;

        let harness_config = HarnessConfig {
            arch: self.config.arch.clone(),
            disk_image: job.disk_image.clone(),
            snapshot_name: job.snapshot_name.clone(),
            share_transport: if self.config.use_vfs { ShareTransport::VirtFs } else { ShareTransport::Smb },
            display: if self.config.enable_vm_screenshots { DisplayMode::Vnc(0) } else { DisplayMode::Off },
            enable_time_compression: self.config.enable_time_compression,
            max_parallel_vms: self.config.max_parallel_vms,
            session_timeout: Duration::from_secs(self.config.timeout),
            crash_dir: self.ctx_state_dir.join(&self.config.crash_dir),
            vm_scratch_root: self.ctx_state_dir.join("vms"),
            rebalance_every: 20,
        };

        let registry = Registry::new(&self.ctx_state_dir);
        let accountant = Arc::new(ResourceAccountant::new(
            &self.ctx_state_dir,
            AccountantPolicy::default(),
            Box::new(LinuxSystemStatsSampler::default()) as Box<dyn SystemStatsSampler>,
        ));
        let store = Arc::clone(&self.store);
        let statuses = self.statuses.clone();
        let job_id = request.job_id;
        let corpus_dir = request.corpus_dir;
        let mutate_output_dir = request.job_dir.join("mutated");

        let mut harness = Harness::new(
            job,
            harness_config,
            &corpus_dir,
            &mutate_output_dir,
            accountant,
            Box::new(LinuxSystemStatsSampler::default()) as Box<dyn SystemStatsSampler>,
            registry,
            store,
            Arc::new(SystemClock) as Arc<dyn Clock>,
        )
        .map_err(|e| DispatchError::Io(std::io::Error::other(e)))?;

        tokio::spawn(async move {
            if let Err(err) = harness.run().await {
                error!(job_id, %err, "harness run failed");
            }
            statuses.set(job_id, vmfuzz_core::JobStatus::Completed);
            if let Err(err) = harness.shutdown().await {
                error!(job_id, %err, "harness shutdown failed");
            }
        });
        Ok(())
    }
}

pub async fn handle(args: WorkerArgs, ctx: &Context) -> Result<(), CliError> {
    let bind_addr = args.bind.unwrap_or_else(|| format!("{}:{}", ctx.config.controller_host, ctx.config.controller_port));
    let store = ctx.open_store()?;
    let statuses = JobStatusTable::default();

    let auth = if ctx.config.auth_enabled {
        match ctx.api_key() {
            Some(key) => ApiKeyStore::new(vec![key]),
            None => ApiKeyStore::disabled(),
        }
    } else {
        ApiKeyStore::disabled()
    };

    let launcher = Arc::new(HarnessLauncher {
        ctx_state_dir: ctx.state_dir.clone(),
        config: ctx.config.clone(),
        store: Arc::clone(&store),
        statuses: statuses.clone(),
    });

    let worker_config = WorkerConfig {
        bind_addr,
        job_root: ctx.job_root(),
        tls_enabled: ctx.config.tls_enabled,
        cert_path: ctx.cert_path(),
        key_path: ctx.key_path(),
    };

    let worker = Worker::bind(worker_config, auth, launcher, statuses, store).await?;
    info!(addr = %worker.local_addr()?, "worker dispatch listener up");

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let shutdown_signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_signal.notify_one();
    });

    worker.run(shutdown).await;
    Ok(())
}
