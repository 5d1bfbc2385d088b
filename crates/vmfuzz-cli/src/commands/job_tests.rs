// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use vmfuzz_core::{Job, JobCounters};

fn ctx_in(dir: &std::path::Path) -> Context {
    Context::load(dir.to_path_buf()).unwrap()
}

fn sample_job(id: i64, name: &str) -> Job {
    Job {
        id: JobId::new(id),
        name: name.to_string(),
        disk_image: "/images/target.qcow2".into(),
        snapshot_name: Some("clean".to_string()),
        fuzzer_kind: "generic".to_string(),
        fuzzer_config: serde_json::Value::Null,
        created_at_ms: 1_700_000_000_000,
        status: JobStatus::Pending,
        counters: JobCounters::default(),
    }
}

#[test]
fn list_prints_every_stored_job_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_in(dir.path());
    let store = ctx.open_store().unwrap();
    store.insert_job(&sample_job(1, "alpha")).unwrap();
    store.insert_job(&sample_job(2, "beta")).unwrap();

    assert!(list(&ctx).is_ok());
    assert_eq!(store.list_jobs().unwrap().len(), 2);
}

#[test]
fn show_returns_job_not_found_for_missing_id() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_in(dir.path());
    ctx.open_store().unwrap();

    let err = show(&ctx, 42).unwrap_err();
    assert!(matches!(err, CliError::JobNotFound(42)));
}

#[test]
fn set_status_updates_an_existing_job() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_in(dir.path());
    let store = ctx.open_store().unwrap();
    store.insert_job(&sample_job(7, "gamma")).unwrap();

    set_status(&ctx, 7, JobStatus::Stopped).unwrap();

    let job = store.get_job(JobId::new(7)).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Stopped);
}

#[test]
fn set_status_on_missing_job_errors() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_in(dir.path());
    ctx.open_store().unwrap();

    let err = set_status(&ctx, 99, JobStatus::Stopped).unwrap_err();
    assert!(matches!(err, CliError::JobNotFound(99)));
}

#[test]
fn delete_removes_the_job_row() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_in(dir.path());
    let store = ctx.open_store().unwrap();
    store.insert_job(&sample_job(3, "delta")).unwrap();

    delete(&ctx, 3).unwrap();

    assert!(store.get_job(JobId::new(3)).unwrap().is_none());
}

#[test]
fn submit_writes_a_submission_document_into_the_submission_dir() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_in(dir.path());

    let config_path = dir.path().join("job.json");
    let config = vmfuzz_core::JobConfig {
        name: "nightly".to_string(),
        disk_image: "/images/target.qcow2".into(),
        snapshot_name: Some("clean".to_string()),
        fuzzer_kind: "generic".to_string(),
        fuzzer_config: serde_json::Value::Null,
    };
    std::fs::write(&config_path, serde_json::to_vec(&config).unwrap()).unwrap();

    let corpus_dir = dir.path().join("corpus");
    std::fs::create_dir_all(&corpus_dir).unwrap();

    submit(&ctx, &config_path, &corpus_dir).unwrap();

    let written = std::fs::read_to_string(ctx.submission_dir().join("job.json")).unwrap();
    let submission: vmfuzz_dispatch::JobSubmission = serde_json::from_str(&written).unwrap();
    assert_eq!(submission.config.name, "nightly");
    assert_eq!(submission.corpus_dir, corpus_dir);
}
