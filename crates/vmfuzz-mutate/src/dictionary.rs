// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dictionary of byte-string tokens, learned from crashing inputs and used
//! by the `dictionary` strategy family. Indexed by length so a mutation
//! site of a given size can look up size-matched tokens.

use crate::error::MutationError;
use std::collections::HashMap;

const MIN_TOKEN_LEN: usize = 1;
const MAX_TOKEN_LEN: usize = 1024;
const LEARN_WINDOW_SIZES: &[usize] = &[4, 8];

#[derive(Debug, Default)]
pub struct Dictionary {
    by_length: HashMap<usize, Vec<Vec<u8>>>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `token`, rejecting lengths outside `1..=1024`. Duplicate
    /// tokens of the same length are allowed (no frequency tracking).
    pub fn insert(&mut self, token: Vec<u8>) -> Result<(), MutationError> {
        if token.is_empty() || token.len() > MAX_TOKEN_LEN {
            return Err(MutationError::InvalidTokenLength(token.len()));
        }
        self.by_length.entry(token.len()).or_default().push(token);
        Ok(())
    }

    /// Extracts sliding windows of each size in [`LEARN_WINDOW_SIZES`] from
    /// a crashing test case and adds them as tokens.
    pub fn learn_from_crash(&mut self, data: &[u8]) {
        for &window in LEARN_WINDOW_SIZES {
            if data.len() < window {
                continue;
            }
            for start in 0..=(data.len() - window) {
                let _ = self.insert(data[start..start + window].to_vec());
            }
        }
    }

    /// Returns tokens whose length is within `tolerance` bytes of `size`.
    pub fn tokens_near(&self, size: usize, tolerance: usize) -> Vec<&[u8]> {
        let lo = size.saturating_sub(tolerance).max(MIN_TOKEN_LEN);
        let hi = size + tolerance;
        let mut out = Vec::new();
        for len in lo..=hi {
            if let Some(tokens) = self.by_length.get(&len) {
                out.extend(tokens.iter().map(|t| t.as_slice()));
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.by_length.values().all(|v| v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.by_length.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
#[path = "dictionary_tests.rs"]
mod tests;
