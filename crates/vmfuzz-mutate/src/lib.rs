// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Format-aware and generic mutation engine: seed corpus management,
//! weighted strategy sampling with crash-feedback boosting, per-seed
//! energy scheduling, and dictionary learning from crashing inputs.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod dictionary;
mod energy;
mod engine;
mod error;
mod format;
mod pool;
mod strategy;

pub use dictionary::Dictionary;
pub use energy::{EnergyScheduler, SeedEnergy};
pub use engine::MutationEngine;
pub use error::MutationError;
pub use format::{FieldSpec, FieldType, FormatSpec};
pub use pool::StrategyPool;
pub use strategy::Strategy;
