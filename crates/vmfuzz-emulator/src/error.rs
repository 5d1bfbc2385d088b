// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("unknown architecture {0:?}")]
    UnknownArch(String),

    #[error("at the parallel VM cap ({0})")]
    AtCapacity(u32),

    #[error("failed to spawn emulator process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("snapshot {snapshot:?} has no memory state and cannot be loaded (disk-only snapshot)")]
    DiskOnlySnapshot { snapshot: String },

    #[error("emulator process exited immediately after spawn (stderr: {stderr})")]
    ExitedImmediately { stderr: String },

    #[error("no free TCP port available")]
    NoFreePort(#[source] std::io::Error),

    #[error("monitor connection failed: {0}")]
    MonitorConnect(#[source] std::io::Error),

    #[error("monitor command timed out")]
    MonitorTimeout,

    #[error("monitor reported an error: {0}")]
    MonitorError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
