// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Everything a subcommand needs to touch local state: the loaded process
//! config and the paths derived from it.

use crate::error::CliError;
use std::path::PathBuf;
use std::sync::Arc;
use vmfuzz_config::Config;
use vmfuzz_store::Store;

pub struct Context {
    pub state_dir: PathBuf,
    pub config: Config,
}

impl Context {
    pub fn load(state_dir: PathBuf) -> Result<Self, CliError> {
        let config = Config::load(&state_dir)?;
        Ok(Self { state_dir, config })
    }

    pub fn store_path(&self) -> PathBuf {
        self.state_dir.join("store.db")
    }

    pub fn open_store(&self) -> Result<Arc<Store>, CliError> {
        Ok(Store::open(&self.store_path())?)
    }

    pub fn submission_dir(&self) -> PathBuf {
        self.state_dir.join("submissions")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.state_dir.join("staging")
    }

    pub fn job_root(&self) -> PathBuf {
        self.state_dir.join("jobs")
    }

    pub fn vm_scratch_root(&self) -> PathBuf {
        self.state_dir.join("vms")
    }

    pub fn cert_path(&self) -> PathBuf {
        self.state_dir.join("dispatch.crt")
    }

    pub fn key_path(&self) -> PathBuf {
        self.state_dir.join("dispatch.key")
    }

    /// The API key configured for this node, when auth is enabled. Read
    /// from the config document's free-form `extra` map since it is a
    /// credential rather than a tuning knob, and operators may prefer to
    /// keep it out of version-controlled defaults.
    pub fn api_key(&self) -> Option<String> {
        self.config.extra.get("api_key").and_then(|v| v.as_str()).map(str::to_string)
    }
}

pub fn resolve_state_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match override_dir {
        Some(dir) => Ok(dir),
        None => Ok(vmfuzz_config::Config::default_state_dir()?),
    }
}
