// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use vmfuzz_config::{AccountantError, ConfigError};
use vmfuzz_crash::CrashPipelineError;
use vmfuzz_dispatch::DispatchError;
use vmfuzz_emulator::EmulatorError;
use vmfuzz_replay::ReplayError;
use vmfuzz_store::StoreError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Accountant(#[from] AccountantError),

    #[error(transparent)]
    Emulator(#[from] EmulatorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    CrashPipeline(#[from] CrashPipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("job {0} not found")]
    JobNotFound(i64),

    #[error("VM {0} not found")]
    VmNotFound(i64),

    #[error("no worker is registered at address {0}")]
    NoSuchWorker(String),

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// Exit code per the process's documented contract: 1 for every
    /// configuration or runtime error, distinguishing only user interrupt
    /// (130, raised directly from `main`, never constructed here).
    pub fn exit_code(&self) -> i32 {
        1
    }
}
