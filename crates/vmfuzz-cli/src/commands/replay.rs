// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vmfuzzctl replay <crash-id>` and `replay --archive <path>`.

use crate::context::Context;
use crate::error::CliError;
use clap::Args;
use std::path::PathBuf;
use vmfuzz_core::CrashId;
use vmfuzz_emulator::{DisplayMode, ShareTransport};
use vmfuzz_replay::{ReplaySpawnConfig, StdinExitWaiter};

#[derive(Args)]
pub struct ReplayArgs {
    /// Id of a crash already recorded in this node's store.
    #[arg(conflicts_with = "archive")]
    pub crash_id: Option<i64>,
    /// Standalone crash artifact archive, instead of a stored crash id.
    #[arg(long, conflicts_with = "crash_id")]
    pub archive: Option<PathBuf>,
    /// Disk image to use when replaying from an archive whose job is not
    /// in this node's store.
    #[arg(long, requires = "archive")]
    pub disk_image: Option<PathBuf>,
    /// Snapshot name to pair with `--disk-image`.
    #[arg(long, requires = "disk_image")]
    pub snapshot_name: Option<String>,
}

pub async fn handle(args: ReplayArgs, ctx: &Context) -> Result<(), CliError> {
    let scratch_dir = ctx.state_dir.join("replay");
    std::fs::create_dir_all(&scratch_dir)?;

    let target = match (args.crash_id, args.archive) {
        (Some(id), None) => {
            let store = ctx.open_store()?;
            vmfuzz_replay::from_crash_id(&store, CrashId::new(id), &scratch_dir)?
        }
        (None, Some(archive)) => {
            let store = ctx.open_store()?;
            let disk_override = args.disk_image.map(|disk_image| (disk_image, args.snapshot_name));
            vmfuzz_replay::from_archive(&archive, Some(store.as_ref()), disk_override, &scratch_dir)?
        }
        _ => return Err(CliError::Usage("exactly one of <crash-id> or --archive is required".to_string())),
    };

    let spawn_config = ReplaySpawnConfig {
        arch: ctx.config.arch.clone(),
        share_transport: if ctx.config.use_vfs { ShareTransport::VirtFs } else { ShareTransport::Smb },
        display: if ctx.config.enable_vm_screenshots { DisplayMode::Vnc(0) } else { DisplayMode::Off },
        scratch_root: ctx.vm_scratch_root(),
    };

    println!("launching replay VM for job {}, waiting on debug stub...", target.job_id.get());
    let spawned = vmfuzz_replay::launch(&target, &spawn_config).await?;
    println!(
        "attach a debugger to 127.0.0.1:{} (monitor on {}); press enter here when done",
        spawned.record.ports.debug_stub, spawned.record.ports.monitor
    );

    vmfuzz_replay::run_interactive(spawned, &StdinExitWaiter).await?;
    println!("replay session finished");
    Ok(())
}
