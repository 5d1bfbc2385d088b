// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Weighted strategy pool: tracks per-strategy weight/attempts/successes
//! and materializes an expanded, repeated-element vector proportional to
//! `weight * 10` for uniform sampling.

use crate::strategy::Strategy;
use rand::Rng;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct StrategyState {
    weight: f64,
    attempts: u64,
    successes: u64,
}

#[derive(Debug)]
pub struct StrategyPool {
    states: HashMap<Strategy, StrategyState>,
}

impl Default for StrategyPool {
    fn default() -> Self {
        let states = Strategy::ALL
            .iter()
            .map(|s| (*s, StrategyState { weight: s.initial_weight(), attempts: 0, successes: 0 }))
            .collect();
        Self { states }
    }
}

impl StrategyPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weight_of(&self, strategy: Strategy) -> f64 {
        self.states.get(&strategy).map(|s| s.weight).unwrap_or(strategy.initial_weight())
    }

    /// Samples a strategy proportionally to its weight, doubling the
    /// weight of any strategy named in `boosted` to reflect crash-feedback
    /// hints (e.g. many buffer-overflow crashes favor `block_insert`).
    pub fn sample(&self, boosted: &[Strategy], rng: &mut impl Rng) -> Strategy {
        let mut expanded = Vec::new();
        for strategy in Strategy::ALL {
            let mut weight = self.weight_of(*strategy);
            if boosted.contains(strategy) {
                weight *= 2.0;
            }
            let repeats = (weight * 10.0).round().max(1.0) as usize;
            expanded.extend(std::iter::repeat(*strategy).take(repeats));
        }
        expanded[rng.random_range(0..expanded.len())]
    }

    /// Records that a test case produced by `strategy` was followed by a
    /// new unique crash: `successes += 1`, `weight := 1 + 10 * successes / attempts`.
    pub fn record_success(&mut self, strategy: Strategy) {
        let state = self.states.entry(strategy).or_insert(StrategyState {
            weight: strategy.initial_weight(),
            attempts: 0,
            successes: 0,
        });
        state.successes += 1;
        state.attempts = state.attempts.max(1);
        state.weight = 1.0 + 10.0 * (state.successes as f64 / state.attempts as f64);
    }

    pub fn record_attempt(&mut self, strategy: Strategy) {
        let state = self.states.entry(strategy).or_insert(StrategyState {
            weight: strategy.initial_weight(),
            attempts: 0,
            successes: 0,
        });
        state.attempts += 1;
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
