// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vmfuzzctl vm list|stop|screenshot`.

use crate::context::Context;
use crate::error::CliError;
use crate::table::Table;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use vmfuzz_config::Registry;
use vmfuzz_core::VmId;

#[derive(Args)]
pub struct VmArgs {
    #[command(subcommand)]
    pub command: VmCommand,
}

#[derive(Subcommand)]
pub enum VmCommand {
    /// List VMs tracked in this node's registry.
    List,
    /// Terminate a VM's emulator process.
    Stop {
        id: i64,
        /// Also remove the VM's scratch directory.
        #[arg(long)]
        force: bool,
    },
    /// Capture a screenshot of a running VM's display.
    Screenshot {
        id: i64,
        /// Destination PNG path.
        dest: PathBuf,
    },
}

pub async fn handle(command: VmCommand, ctx: &Context) -> Result<(), CliError> {
    match command {
        VmCommand::List => list(ctx),
        VmCommand::Stop { id, force } => stop(ctx, id, force).await,
        VmCommand::Screenshot { id, dest } => screenshot(ctx, id, &dest).await,
    }
}

fn list(ctx: &Context) -> Result<(), CliError> {
    let registry = Registry::new(&ctx.state_dir);
    let mut table = Table::new(vec!["id", "pid", "status", "job", "snapshot"]);
    for vm in registry.list()? {
        table.push(vec![
            vm.id.get().to_string(),
            vm.pid.to_string(),
            format!("{:?}", vm.status).to_lowercase(),
            vm.current_job.map(|j| j.get().to_string()).unwrap_or_else(|| "-".to_string()),
            vm.snapshot_name.unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.print();
    Ok(())
}

async fn stop(ctx: &Context, id: i64, force: bool) -> Result<(), CliError> {
    let registry = Registry::new(&ctx.state_dir);
    let vm_id = VmId::new(id);
    let mut record = registry.get(vm_id)?.ok_or(CliError::VmNotFound(id))?;
    vmfuzz_emulator::stop_vm(&mut record, force).await?;
    registry.update_vm(&record)?;
    println!("vm {id} stopped");
    Ok(())
}

async fn screenshot(ctx: &Context, id: i64, dest: &std::path::Path) -> Result<(), CliError> {
    let registry = Registry::new(&ctx.state_dir);
    let vm_id = VmId::new(id);
    let record = registry.get(vm_id)?.ok_or(CliError::VmNotFound(id))?;
    vmfuzz_emulator::screenshot(&record, dest).await?;
    println!("screenshot written to {}", dest.display());
    Ok(())
}

#[cfg(test)]
#[path = "vm_tests.rs"]
mod tests;
