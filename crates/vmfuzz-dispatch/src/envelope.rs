// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format for the dispatch protocol: a 4-byte big-endian length
//! prefix followed by a JSON-encoded [`Envelope`].

use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Largest envelope this side will accept. `PUSH_JOB`'s archive bytes are
/// streamed separately, after the envelope, so this only bounds metadata.
pub const MAX_ENVELOPE_SIZE: u32 = 1024 * 1024;

pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthHeader {
    pub method: AuthMethod,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ApiKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    PushJob {
        job_id: i64,
        config: serde_json::Value,
        package_size: u64,
        auth: Option<AuthHeader>,
    },
    StatusRequest {
        auth: Option<AuthHeader>,
    },
    StatusResponse {
        jobs: std::collections::HashMap<String, String>,
    },
    CrashRequest {
        job_id: i64,
        auth: Option<AuthHeader>,
    },
    CrashResponse {
        crashes: Vec<serde_json::Value>,
    },
    Ack,
    Error {
        message: String,
    },
}

impl Envelope {
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::PushJob { .. } => "PUSH_JOB",
            Envelope::StatusRequest { .. } => "STATUS_REQUEST",
            Envelope::StatusResponse { .. } => "STATUS_RESPONSE",
            Envelope::CrashRequest { .. } => "CRASH_REQUEST",
            Envelope::CrashResponse { .. } => "CRASH_RESPONSE",
            Envelope::Ack => "ACK",
            Envelope::Error { .. } => "ERROR",
        }
    }

    pub fn auth(&self) -> Option<&AuthHeader> {
        match self {
            Envelope::PushJob { auth, .. } => auth.as_ref(),
            Envelope::StatusRequest { auth } => auth.as_ref(),
            Envelope::CrashRequest { auth, .. } => auth.as_ref(),
            _ => None,
        }
    }
}

/// Reads one length-prefixed JSON envelope.
pub async fn read_envelope<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Envelope, DispatchError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(DispatchError::ConnectionClosed),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_ENVELOPE_SIZE {
        return Err(DispatchError::EnvelopeTooLarge { size: len, max: MAX_ENVELOPE_SIZE });
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(serde_json::from_slice(&buf)?)
}

/// Writes one length-prefixed JSON envelope.
pub async fn write_envelope<W: AsyncWriteExt + Unpin>(writer: &mut W, envelope: &Envelope) -> Result<(), DispatchError> {
    let body = serde_json::to_vec(envelope)?;
    if body.len() as u64 > MAX_ENVELOPE_SIZE as u64 {
        return Err(DispatchError::EnvelopeTooLarge { size: body.len() as u32, max: MAX_ENVELOPE_SIZE });
    }
    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads an envelope with a deadline, translating elapsed timeouts.
pub async fn read_envelope_timeout<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<Envelope, DispatchError> {
    tokio::time::timeout(timeout, read_envelope(reader))
        .await
        .map_err(|_| DispatchError::Timeout("envelope"))?
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
