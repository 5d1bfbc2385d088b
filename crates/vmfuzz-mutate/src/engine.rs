// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ties the corpus, strategy pool, dictionary, and energy scheduler
//! together into the `next()` / crash-feedback loop the fuzzing harness
//! drives one iteration at a time.

use crate::dictionary::Dictionary;
use crate::energy::EnergyScheduler;
use crate::error::MutationError;
use crate::format::FormatSpec;
use crate::pool::StrategyPool;
use crate::strategy::{self, Strategy};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_SEED_ENERGY: u32 = 100;

struct Seed {
    bytes: Vec<u8>,
    format_spec: Option<FormatSpec>,
}

/// Strategy and seed provenance for a generated test case, retained so a
/// later crash report can be attributed back to the strategy and seed that
/// produced it.
#[derive(Debug, Clone)]
struct Provenance {
    seed_index: usize,
    strategy: Strategy,
}

pub struct MutationEngine {
    seeds: Vec<Seed>,
    scheduler: EnergyScheduler,
    pool: StrategyPool,
    dictionary: Dictionary,
    output_dir: PathBuf,
    provenance: HashMap<PathBuf, Provenance>,
}

fn is_json_sidecar(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn load_corpus(dir: &Path) -> Result<Vec<Seed>, MutationError> {
    let mut seeds = Vec::new();
    let entries = std::fs::read_dir(dir)?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || is_json_sidecar(&path) {
            continue;
        }
        let bytes = std::fs::read(&path).map_err(|e| MutationError::CorpusRead { path: path.clone(), source: e })?;
        let spec_path = path.with_extension("json");
        let format_spec = if spec_path.exists() {
            let spec_bytes = std::fs::read(&spec_path)?;
            Some(serde_json::from_slice(&spec_bytes).map_err(|e| MutationError::FormatSpecParse { path: spec_path, source: e })?)
        } else {
            None
        };
        seeds.push(Seed { bytes, format_spec });
    }
    if seeds.is_empty() {
        return Err(MutationError::EmptyCorpus(dir.to_path_buf()));
    }
    Ok(seeds)
}

fn boosted_strategies_for(kind_hint: &str) -> Vec<Strategy> {
    let lower = kind_hint.to_ascii_lowercase();
    if lower.contains("buffer_overflow") || lower.contains("overflow") {
        vec![Strategy::BlockInsert]
    } else if lower.contains("access_violation") || lower.contains("segv") {
        vec![Strategy::Interesting, Strategy::Arith]
    } else {
        Vec::new()
    }
}

impl MutationEngine {
    pub fn new(corpus_dir: &Path, output_dir: &Path) -> Result<Self, MutationError> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            seeds: load_corpus(corpus_dir)?,
            scheduler: EnergyScheduler::new(0, DEFAULT_SEED_ENERGY),
            pool: StrategyPool::new(),
            dictionary: Dictionary::new(),
            output_dir: output_dir.to_path_buf(),
            provenance: HashMap::new(),
        })
        .map(|mut engine| {
            engine.scheduler = EnergyScheduler::new(engine.seeds.len(), DEFAULT_SEED_ENERGY);
            engine
        })
    }

    pub fn dictionary_len(&self) -> usize {
        self.dictionary.len()
    }

    /// Generates the next mutated test case, writes it under the output
    /// directory, and returns its path. Returns `None` once every seed's
    /// energy budget is exhausted.
    pub fn next_testcase(&mut self, boost_hint: Option<&str>, rng: &mut impl Rng) -> Result<Option<PathBuf>, MutationError> {
        let Some(seed_index) = self.scheduler.next() else {
            return Ok(None);
        };
        let boosted = boost_hint.map(boosted_strategies_for).unwrap_or_default();
        let strategy = self.pool.sample(&boosted, rng);
        self.pool.record_attempt(strategy);

        let seed = &self.seeds[seed_index];
        let mutated = match &seed.format_spec {
            Some(spec) => crate::format::mutate_format_aware(&seed.bytes, spec, rng),
            None => {
                let other_seed = if self.seeds.len() > 1 {
                    let other_index = (seed_index + 1) % self.seeds.len();
                    Some(self.seeds[other_index].bytes.as_slice())
                } else {
                    None
                };
                strategy::apply(strategy, &seed.bytes, &self.dictionary, other_seed, rng)
            }
        };

        let path = self.write_output(strategy, &mutated)?;
        self.provenance.insert(path.clone(), Provenance { seed_index, strategy });
        Ok(Some(path))
    }

    fn write_output(&self, strategy: Strategy, bytes: &[u8]) -> Result<PathBuf, MutationError> {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let short_hash = digest.iter().take(4).map(|b| format!("{b:02x}")).collect::<String>();
        let path = self.output_dir.join(format!("{}_{}.bin", strategy.name(), short_hash));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Called when the harness reports that a generated test case crashed:
    /// credits the producing strategy and seed, and folds the crashing
    /// bytes into the dictionary.
    pub fn record_crash(&mut self, testcase_path: &Path, crash_bytes: &[u8]) {
        self.dictionary.learn_from_crash(crash_bytes);
        if let Some(provenance) = self.provenance.get(testcase_path).cloned() {
            self.pool.record_success(provenance.strategy);
            self.scheduler.credit_crash(provenance.seed_index);
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
