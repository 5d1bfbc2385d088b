// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to (de)serialize JSON column: {0}")]
    Json(#[from] serde_json::Error),

    #[error("job {0} does not exist")]
    JobNotFound(vmfuzz_core::JobId),

    #[error("crash {0} does not exist")]
    CrashNotFound(vmfuzz_core::CrashId),
}
