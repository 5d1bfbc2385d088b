// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vmfuzzctl job submit|list|show|stop|delete`.

use crate::context::Context;
use crate::error::CliError;
use crate::table::Table;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use vmfuzz_core::{JobId, JobStatus};
use vmfuzz_dispatch::JobSubmission;

#[derive(Args)]
pub struct JobArgs {
    #[command(subcommand)]
    pub command: JobCommand,
}

#[derive(Subcommand)]
pub enum JobCommand {
    /// Write a job definition into the submission directory for the
    /// controller to pick up and push to an idle worker.
    Submit {
        /// Path to a JSON `JobConfig` document.
        config: PathBuf,
        /// Seed corpus directory to package alongside the job.
        #[arg(long)]
        corpus_dir: PathBuf,
    },
    /// List jobs recorded in this node's store.
    List,
    /// Show one job's full record.
    Show { id: i64 },
    /// Mark a job stopped.
    Stop { id: i64 },
    /// Remove a job's row from the store.
    Delete { id: i64 },
}

pub fn handle(command: JobCommand, ctx: &Context) -> Result<(), CliError> {
    match command {
        JobCommand::Submit { config, corpus_dir } => submit(ctx, &config, &corpus_dir),
        JobCommand::List => list(ctx),
        JobCommand::Show { id } => show(ctx, id),
        JobCommand::Stop { id } => set_status(ctx, id, JobStatus::Stopped),
        JobCommand::Delete { id } => delete(ctx, id),
    }
}

fn submit(ctx: &Context, config_path: &std::path::Path, corpus_dir: &std::path::Path) -> Result<(), CliError> {
    let bytes = std::fs::read(config_path)?;
    let config: vmfuzz_core::JobConfig = serde_json::from_slice(&bytes)?;
    let submission = JobSubmission { config, corpus_dir: corpus_dir.to_path_buf() };

    let submission_dir = ctx.submission_dir();
    std::fs::create_dir_all(&submission_dir)?;
    let file_name = format!("{}.json", config_path.file_stem().and_then(|s| s.to_str()).unwrap_or("job"));
    let dest = submission_dir.join(file_name);
    std::fs::write(&dest, serde_json::to_vec_pretty(&submission)?)?;

    println!("submission written to {}", dest.display());
    Ok(())
}

fn list(ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let mut table = Table::new(vec!["id", "name", "status", "generated", "vms"]);
    for job in store.list_jobs()? {
        table.push(vec![
            job.id.get().to_string(),
            job.name,
            job.status.to_string(),
            job.counters.generated_testcases.to_string(),
            job.counters.vm_count.to_string(),
        ]);
    }
    table.print();
    Ok(())
}

fn show(ctx: &Context, id: i64) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let job = store.get_job(JobId::new(id))?.ok_or(CliError::JobNotFound(id))?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}

fn set_status(ctx: &Context, id: i64, status: JobStatus) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    let job_id = JobId::new(id);
    if store.get_job(job_id)?.is_none() {
        return Err(CliError::JobNotFound(id));
    }
    store.update_job_status(job_id, status)?;
    println!("job {id} is now {status}");
    Ok(())
}

fn delete(ctx: &Context, id: i64) -> Result<(), CliError> {
    let store = ctx.open_store()?;
    store.delete_job(JobId::new(id))?;
    println!("job {id} deleted");
    Ok(())
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
