// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DebugStubError {
    #[error("debug stub at port {0} did not come up before the deadline")]
    PortNeverOpened(u16),

    #[error("failed to write debugger script: {0}")]
    ScriptWrite(#[source] std::io::Error),

    #[error("failed to launch debugger: {0}")]
    Launch(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
