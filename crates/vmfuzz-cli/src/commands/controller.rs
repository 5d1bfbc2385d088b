// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vmfuzzctl controller serve` — the controller-mode submission poll loop.

use crate::context::Context;
use crate::error::CliError;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use vmfuzz_core::SystemClock;
use vmfuzz_dispatch::{Controller, ControllerConfig, WorkerTable};

#[derive(Args)]
pub struct ControllerArgs {
    /// `worker-id=host:port` entries to seed the fleet roster with. Can be
    /// repeated; workers registered this way start out idle.
    #[arg(long = "worker", value_parser = parse_worker)]
    pub workers: Vec<(String, String)>,
    /// Submission poll interval, in seconds.
    #[arg(long, default_value_t = 5)]
    pub poll_interval_secs: u64,
}

fn parse_worker(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(id, addr)| (id.to_string(), addr.to_string()))
        .ok_or_else(|| format!("expected worker-id=host:port, got {raw}"))
}

pub async fn handle(args: ControllerArgs, ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let workers = Arc::new(WorkerTable::new());
    for (id, addr) in &args.workers {
        workers.register(id.clone(), addr.clone());
    }

    let submission_dir = ctx.submission_dir();
    let staging_dir = ctx.staging_dir();
    std::fs::create_dir_all(&submission_dir)?;
    std::fs::create_dir_all(&staging_dir)?;

    let config = ControllerConfig {
        submission_dir,
        staging_dir,
        poll_interval: Duration::from_secs(args.poll_interval_secs),
        tls_enabled: ctx.config.tls_enabled,
        api_key: ctx.api_key(),
    };

    let controller = Arc::new(Controller::new(config, workers, store, Arc::new(SystemClock)));
    info!(workers = args.workers.len(), "controller poll loop starting");

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let shutdown_signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_signal.notify_one();
    });

    controller.run(shutdown).await;
    Ok(())
}
