// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! vmfuzzctl - operator CLI for the distributed fuzzing orchestrator.

mod commands;
mod context;
mod error;
mod table;

use clap::{Parser, Subcommand};
use commands::{config, controller, job, replay, vm, worker};
use context::Context;
use error::CliError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vmfuzzctl", version, about = "Operator CLI for the fuzzing orchestrator")]
struct Cli {
    /// Override the default state directory (`~/.vmfuzz`).
    #[arg(long, global = true, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Job submission and lifecycle management.
    Job(job::JobArgs),
    /// VM inspection and control.
    Vm(vm::VmArgs),
    /// Worker-mode dispatch listener.
    Worker(worker::WorkerArgs),
    /// Controller-mode submission poll loop.
    Controller(controller::ControllerArgs),
    /// Replay a recorded crash with an interactive debugger attached.
    Replay(replay::ReplayArgs),
    /// Local config document management.
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let state_dir = context::resolve_state_dir(cli.state_dir)?;
    let ctx = Context::load(state_dir)?;

    match cli.command {
        Commands::Job(args) => job::handle(args.command, &ctx),
        Commands::Vm(args) => vm::handle(args.command, &ctx).await,
        Commands::Worker(args) => worker::handle(args, &ctx).await,
        Commands::Controller(args) => controller::handle(args, &ctx).await,
        Commands::Replay(args) => replay::handle(args, &ctx).await,
        Commands::Config(args) => config::handle(args.command, &ctx),
    }
}
