// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use vmfuzz_debugstub::DebugStubError;
use vmfuzz_emulator::EmulatorError;
use vmfuzz_store::StoreError;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("crash {0} is not in the store")]
    UnknownCrash(i64),

    #[error("job {0} referenced by the crash is not in the store")]
    UnknownJob(i64),

    #[error("archive has no crash_info.json entry")]
    MissingCrashInfo,

    #[error("archive has no testcase entry")]
    MissingTestcase,

    #[error("crash record has no testcase on disk and no artifact archive to fall back to")]
    NoTestcaseAvailable,

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Emulator(#[from] EmulatorError),

    #[error(transparent)]
    DebugStub(#[from] DebugStubError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed crash_info.json: {0}")]
    Json(#[from] serde_json::Error),
}
