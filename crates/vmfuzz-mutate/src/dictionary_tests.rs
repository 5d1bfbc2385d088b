// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn zero_length_token_is_rejected() {
    let mut dict = Dictionary::new();
    assert!(matches!(dict.insert(Vec::new()), Err(MutationError::InvalidTokenLength(0))));
}

#[test]
fn oversized_token_is_rejected() {
    let mut dict = Dictionary::new();
    let token = vec![0u8; 1025];
    assert!(matches!(dict.insert(token), Err(MutationError::InvalidTokenLength(1025))));
}

#[test]
fn max_length_token_is_accepted() {
    let mut dict = Dictionary::new();
    assert!(dict.insert(vec![0u8; 1024]).is_ok());
}

#[test]
fn learning_from_a_crash_populates_expected_four_byte_windows() {
    let mut dict = Dictionary::new();
    dict.learn_from_crash(b"AAAA\x00BBBB\x00CCCC");
    assert!(!dict.is_empty());

    let has_token = |needle: &[u8]| dict.tokens_near(4, 0).iter().any(|t| *t == needle);
    assert!(has_token(b"AAAA"));
    assert!(has_token(b"BBBB"));
    assert!(has_token(b"CCCC"));
}

#[test]
fn tokens_near_respects_tolerance() {
    let mut dict = Dictionary::new();
    dict.insert(b"abcd".to_vec()).unwrap();
    assert!(dict.tokens_near(4, 0).contains(&b"abcd".as_slice()));
    assert!(dict.tokens_near(8, 0).is_empty());
    assert!(!dict.tokens_near(8, 4).is_empty());
}
