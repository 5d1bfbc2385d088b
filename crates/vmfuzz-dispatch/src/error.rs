// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("envelope JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope of {size} bytes exceeds the {max}-byte limit")]
    EnvelopeTooLarge { size: u32, max: u32 },

    #[error("connection closed before a full envelope arrived")]
    ConnectionClosed,

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("authentication failed")]
    AuthFailed,

    #[error("unexpected envelope type: expected {expected}, got {got}")]
    UnexpectedEnvelope { expected: &'static str, got: String },

    #[error(transparent)]
    Store(#[from] vmfuzz_store::StoreError),
}
