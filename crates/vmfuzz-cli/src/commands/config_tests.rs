// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn init_then_show_round_trips_through_the_context() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = Context::load(dir.path().to_path_buf()).unwrap();

    assert!(init(&ctx).is_ok());
    assert!(dir.path().join("config.json").exists());
    assert!(show(&ctx).is_ok());
}
