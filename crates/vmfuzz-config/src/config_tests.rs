// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn load_creates_default_config_on_first_run() {
    let dir = tempdir().unwrap();
    let cfg = Config::load(dir.path()).unwrap();
    assert_eq!(cfg.max_parallel_vms, 0);
    assert_eq!(cfg.arch, "x86_64");
    assert!(dir.path().join("config.json").exists());
}

#[test]
fn save_then_load_round_trips_documented_fields() {
    let dir = tempdir().unwrap();
    let mut cfg = Config::load(dir.path()).unwrap();
    cfg.max_parallel_vms = 4;
    cfg.snapshot_name = Some("clean".to_string());
    cfg.save(dir.path()).unwrap();

    let reloaded = Config::load(dir.path()).unwrap();
    assert_eq!(reloaded.max_parallel_vms, 4);
    assert_eq!(reloaded.snapshot_name.as_deref(), Some("clean"));
}

#[test]
fn unknown_keys_are_preserved_in_extra() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"max_parallel_vms": 2, "future_knob": "value"}"#).unwrap();

    let cfg = Config::load(dir.path()).unwrap();
    assert_eq!(cfg.extra.get("future_knob").unwrap(), "value");

    cfg.save(dir.path()).unwrap();
    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["future_knob"], "value");
}
