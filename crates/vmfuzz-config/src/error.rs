// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock on {0}")]
    LockFailed(PathBuf, #[source] std::io::Error),

    #[error("I/O error reading/writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("registry entry {0} is not a valid VM record")]
    InvalidRegistryEntry(i64),
}

#[derive(Debug, Error)]
pub enum AccountantError {
    #[error("failed to acquire lock on {0}")]
    LockFailed(PathBuf, #[source] std::io::Error),

    #[error("I/O error reading/writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
