// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn picked_ports_are_nonzero_and_distinct() {
    let ports = pick_n_free_ports(3).unwrap();
    assert_eq!(ports.len(), 3);
    assert!(ports.iter().all(|p| *p != 0));
    let mut sorted = ports.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), ports.len());
}
