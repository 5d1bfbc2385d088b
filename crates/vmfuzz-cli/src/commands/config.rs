// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vmfuzzctl config show|init`.

use crate::context::Context;
use crate::error::CliError;
use clap::{Args, Subcommand};
use vmfuzz_config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective config document.
    Show,
    /// Write the default config document if one is not already present.
    Init,
}

pub fn handle(command: ConfigCommand, ctx: &Context) -> Result<(), CliError> {
    match command {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Init => init(ctx),
    }
}

fn show(ctx: &Context) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(&ctx.config)?);
    Ok(())
}

fn init(ctx: &Context) -> Result<(), CliError> {
    let config = Config::default();
    config.save(&ctx.state_dir)?;
    println!("wrote default config to {}", ctx.state_dir.join("config.json").display());
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
