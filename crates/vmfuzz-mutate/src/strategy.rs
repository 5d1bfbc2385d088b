// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The generic (format-blind) mutation strategy families and their
//! byte-level implementations.

use crate::dictionary::Dictionary;
use rand::Rng;

const INTERESTING_VALUES: &[i64] = &[0, -1, 1, i8::MIN as i64, i8::MAX as i64, i16::MIN as i64, i16::MAX as i64, i32::MIN as i64, i32::MAX as i64, 0x41414141, 0xDEADBEEFu32 as i64];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    BitFlip1,
    BitFlip2,
    BitFlip4,
    ByteFlip1,
    ByteFlip2,
    ByteFlip4,
    Arith,
    Interesting,
    BlockDelete,
    BlockInsert,
    BlockSwap,
    BlockDuplicate,
    Havoc,
    Splice,
    DictReplace,
    DictInsert,
    DictOverwrite,
}

impl Strategy {
    pub const ALL: &'static [Strategy] = &[
        Strategy::BitFlip1,
        Strategy::BitFlip2,
        Strategy::BitFlip4,
        Strategy::ByteFlip1,
        Strategy::ByteFlip2,
        Strategy::ByteFlip4,
        Strategy::Arith,
        Strategy::Interesting,
        Strategy::BlockDelete,
        Strategy::BlockInsert,
        Strategy::BlockSwap,
        Strategy::BlockDuplicate,
        Strategy::Havoc,
        Strategy::Splice,
        Strategy::DictReplace,
        Strategy::DictInsert,
        Strategy::DictOverwrite,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::BitFlip1 => "bit_flip_1",
            Strategy::BitFlip2 => "bit_flip_2",
            Strategy::BitFlip4 => "bit_flip_4",
            Strategy::ByteFlip1 => "byte_flip_1",
            Strategy::ByteFlip2 => "byte_flip_2",
            Strategy::ByteFlip4 => "byte_flip_4",
            Strategy::Arith => "arith",
            Strategy::Interesting => "interesting",
            Strategy::BlockDelete => "block_delete",
            Strategy::BlockInsert => "block_insert",
            Strategy::BlockSwap => "block_swap",
            Strategy::BlockDuplicate => "block_duplicate",
            Strategy::Havoc => "havoc",
            Strategy::Splice => "splice",
            Strategy::DictReplace => "dict_replace",
            Strategy::DictInsert => "dict_insert",
            Strategy::DictOverwrite => "dict_overwrite",
        }
    }

    pub fn initial_weight(self) -> f64 {
        match self {
            Strategy::BitFlip1 | Strategy::BitFlip2 | Strategy::BitFlip4 => 1.0,
            Strategy::ByteFlip1 | Strategy::ByteFlip2 | Strategy::ByteFlip4 => 1.5,
            Strategy::Arith => 2.0,
            Strategy::Interesting => 2.5,
            Strategy::BlockDelete | Strategy::BlockInsert => 2.0,
            Strategy::BlockSwap | Strategy::BlockDuplicate => 1.5,
            Strategy::Havoc => 3.0,
            Strategy::Splice => 2.0,
            Strategy::DictReplace | Strategy::DictOverwrite => 2.0,
            Strategy::DictInsert => 2.5,
        }
    }
}

fn flip_bits(data: &mut [u8], bit_offset: usize, count: usize) {
    for i in 0..count {
        let bit = bit_offset + i;
        let byte_idx = bit / 8;
        if byte_idx >= data.len() {
            break;
        }
        data[byte_idx] ^= 1 << (bit % 8);
    }
}

/// Applies a single non-havoc, non-splice mutation strategy to a copy of
/// `input`, returning the mutated bytes. `other_seed` is required for
/// [`Strategy::Splice`] and ignored otherwise.
pub fn apply(
    strategy: Strategy,
    input: &[u8],
    dictionary: &Dictionary,
    other_seed: Option<&[u8]>,
    rng: &mut impl Rng,
) -> Vec<u8> {
    if input.is_empty() {
        return input.to_vec();
    }
    let mut out = input.to_vec();
    match strategy {
        Strategy::BitFlip1 => {
            let bit = rng.random_range(0..out.len() * 8);
            flip_bits(&mut out, bit, 1)
        }
        Strategy::BitFlip2 => {
            let bit = rng.random_range(0..out.len() * 8);
            flip_bits(&mut out, bit, 2)
        }
        Strategy::BitFlip4 => {
            let bit = rng.random_range(0..out.len() * 8);
            flip_bits(&mut out, bit, 4)
        }
        Strategy::ByteFlip1 => {
            let i = rng.random_range(0..out.len());
            out[i] = !out[i];
        }
        Strategy::ByteFlip2 => byte_flip_window(&mut out, rng, 2),
        Strategy::ByteFlip4 => byte_flip_window(&mut out, rng, 4),
        Strategy::Arith => apply_arith(&mut out, rng),
        Strategy::Interesting => apply_interesting(&mut out, rng),
        Strategy::BlockDelete => apply_block_delete(&mut out, rng),
        Strategy::BlockInsert => apply_block_insert(&mut out, rng),
        Strategy::BlockSwap => apply_block_swap(&mut out, rng),
        Strategy::BlockDuplicate => apply_block_duplicate(&mut out, rng),
        Strategy::Havoc => return apply_havoc(input, dictionary, other_seed, rng),
        Strategy::Splice => return apply_splice(input, other_seed, rng),
        Strategy::DictReplace => apply_dict(&mut out, dictionary, rng, DictMode::Replace),
        Strategy::DictInsert => apply_dict(&mut out, dictionary, rng, DictMode::Insert),
        Strategy::DictOverwrite => apply_dict(&mut out, dictionary, rng, DictMode::Overwrite),
    }
    out
}

fn byte_flip_window(data: &mut [u8], rng: &mut impl Rng, window: usize) {
    if data.len() < window {
        for b in data.iter_mut() {
            *b = !*b;
        }
        return;
    }
    let start = rng.random_range(0..=data.len() - window);
    for b in &mut data[start..start + window] {
        *b = !*b;
    }
}

fn apply_arith(data: &mut [u8], rng: &mut impl Rng) {
    if data.is_empty() {
        return;
    }
    let delta: i8 = rng.random_range(-35..=35);
    let i = rng.random_range(0..data.len());
    data[i] = data[i].wrapping_add_signed(delta);
}

fn apply_interesting(data: &mut [u8], rng: &mut impl Rng) {
    if data.is_empty() {
        return;
    }
    let value = INTERESTING_VALUES[rng.random_range(0..INTERESTING_VALUES.len())];
    let i = rng.random_range(0..data.len());
    data[i] = value as u8;
}

fn apply_block_delete(data: &mut Vec<u8>, rng: &mut impl Rng) {
    if data.is_empty() {
        return;
    }
    let len = rng.random_range(1..=data.len().min(256));
    let start = rng.random_range(0..=data.len() - len);
    data.drain(start..start + len);
}

fn apply_block_insert(data: &mut Vec<u8>, rng: &mut impl Rng) {
    let len = rng.random_range(1..=256);
    let block: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    let at = rng.random_range(0..=data.len());
    data.splice(at..at, block);
}

fn apply_block_swap(data: &mut [u8], rng: &mut impl Rng) {
    if data.len() < 2 {
        return;
    }
    let a = rng.random_range(0..data.len());
    let b = rng.random_range(0..data.len());
    data.swap(a, b);
}

fn apply_block_duplicate(data: &mut Vec<u8>, rng: &mut impl Rng) {
    if data.is_empty() {
        return;
    }
    let len = rng.random_range(1..=data.len().min(256));
    let start = rng.random_range(0..=data.len() - len);
    let block = data[start..start + len].to_vec();
    let at = rng.random_range(0..=data.len());
    data.splice(at..at, block);
}

#[derive(Clone, Copy)]
enum DictMode {
    Replace,
    Insert,
    Overwrite,
}

fn apply_dict(data: &mut Vec<u8>, dictionary: &Dictionary, rng: &mut impl Rng, mode: DictMode) {
    if data.is_empty() {
        return;
    }
    let size = rng.random_range(1..=data.len().min(64));
    let candidates = dictionary.tokens_near(size, 4);
    if candidates.is_empty() {
        return;
    }
    let token = candidates[rng.random_range(0..candidates.len())].to_vec();
    match mode {
        DictMode::Insert => {
            let at = rng.random_range(0..=data.len());
            data.splice(at..at, token);
        }
        DictMode::Replace | DictMode::Overwrite => {
            let at = rng.random_range(0..data.len());
            let end = (at + token.len()).min(data.len());
            data.splice(at..end, token[..end - at].iter().copied());
        }
    }
}

/// Stacks 2-8 of the non-havoc, non-splice families in sequence.
fn apply_havoc(input: &[u8], dictionary: &Dictionary, _other_seed: Option<&[u8]>, rng: &mut impl Rng) -> Vec<u8> {
    let mut out = input.to_vec();
    let stack_depth = rng.random_range(2..=8);
    let pool: Vec<Strategy> = Strategy::ALL
        .iter()
        .copied()
        .filter(|s| !matches!(s, Strategy::Havoc | Strategy::Splice))
        .collect();
    for _ in 0..stack_depth {
        if out.is_empty() {
            break;
        }
        let strategy = pool[rng.random_range(0..pool.len())];
        out = apply(strategy, &out, dictionary, None, rng);
    }
    out
}

fn apply_splice(input: &[u8], other_seed: Option<&[u8]>, rng: &mut impl Rng) -> Vec<u8> {
    let Some(other) = other_seed else {
        return input.to_vec();
    };
    if input.is_empty() || other.is_empty() {
        return input.to_vec();
    }
    let split_a = rng.random_range(0..input.len());
    let split_b = rng.random_range(0..other.len());
    let mut out = input[..split_a].to_vec();
    out.extend_from_slice(&other[split_b..]);
    out
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;
