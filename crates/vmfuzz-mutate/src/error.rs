// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("corpus directory {0:?} has no usable seeds")]
    EmptyCorpus(std::path::PathBuf),

    #[error("dictionary token length {0} is out of bounds (must be 1..=1024)")]
    InvalidTokenLength(usize),

    #[error("failed to read corpus entry {path:?}: {source}")]
    CorpusRead { path: std::path::PathBuf, source: std::io::Error },

    #[error("failed to parse format spec {path:?}: {source}")]
    FormatSpecParse { path: std::path::PathBuf, source: serde_json::Error },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
