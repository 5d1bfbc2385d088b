// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn sampling_never_panics_and_returns_a_known_strategy() {
    let pool = StrategyPool::new();
    let mut rng = rand::rng();
    for _ in 0..100 {
        let strategy = pool.sample(&[], &mut rng);
        assert!(Strategy::ALL.contains(&strategy));
    }
}

#[test]
fn record_success_raises_weight_above_the_initial_value() {
    let mut pool = StrategyPool::new();
    pool.record_attempt(Strategy::BlockInsert);
    let before = pool.weight_of(Strategy::BlockInsert);
    pool.record_success(Strategy::BlockInsert);
    let after = pool.weight_of(Strategy::BlockInsert);
    assert!(after > before);
}

#[test]
fn boosted_strategy_is_sampled_more_often() {
    let pool = StrategyPool::new();
    let mut rng = rand::rng();
    let boosted = [Strategy::BlockInsert];
    let mut boosted_count = 0;
    let mut total = 0;
    for _ in 0..2000 {
        if pool.sample(&boosted, &mut rng) == Strategy::BlockInsert {
            boosted_count += 1;
        }
        total += 1;
    }
    let baseline_count = {
        let mut c = 0;
        for _ in 0..2000 {
            if pool.sample(&[], &mut rng) == Strategy::BlockInsert {
                c += 1;
            }
        }
        c
    };
    assert!(boosted_count > baseline_count, "boosted={boosted_count} total={total} baseline={baseline_count}");
}
