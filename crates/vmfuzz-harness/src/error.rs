// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use vmfuzz_config::{AccountantError, ConfigError};
use vmfuzz_crash::CrashPipelineError;
use vmfuzz_debugstub::DebugStubError;
use vmfuzz_emulator::EmulatorError;
use vmfuzz_mutate::MutationError;
use vmfuzz_store::StoreError;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("resource accountant refused to reserve a VM slot")]
    NoVmSlotAvailable,

    #[error("VM {0} is not tracked by this harness")]
    UnknownVm(i64),

    #[error(transparent)]
    Accountant(#[from] AccountantError),

    #[error(transparent)]
    Registry(#[from] ConfigError),

    #[error(transparent)]
    Emulator(#[from] EmulatorError),

    #[error(transparent)]
    DebugStub(#[from] DebugStubError),

    #[error(transparent)]
    Mutate(#[from] MutationError),

    #[error(transparent)]
    CrashPipeline(#[from] CrashPipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
