use super::*;
use std::io::Write;
use vmfuzz_core::{Crash, Exploitability, FakeClock, Job, JobConfig};
use zip::write::FileOptions;
use zip::ZipWriter;

fn sample_job_config() -> JobConfig {
    JobConfig {
        name: "nightly".to_string(),
        disk_image: PathBuf::from("/images/target.qcow2"),
        snapshot_name: Some("clean".to_string()),
        fuzzer_kind: "generic".to_string(),
        fuzzer_config: serde_json::Value::Null,
    }
}

fn sample_crash(job_id: JobId, testcase_path: PathBuf, artifact_path: Option<PathBuf>) -> Crash {
    Crash {
        id: CrashId::new(1),
        job_id,
        testcase_path,
        kind: "user".to_string(),
        detail: "SIGSEGV".to_string(),
        signature: "sig-abc".to_string(),
        exploitability: Exploitability::High,
        artifact_path,
        timestamp_ms: 1_700_000_000_000,
        duplicate_count: 0,
        backtrace: None,
        crash_address: None,
        sanitizer_kind: None,
        sanitizer_report: None,
        severity: None,
        is_unique: true,
    }
}

fn write_archive(path: &Path, job_id: i64, crash_id: i64, testcase_bytes: &[u8]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();

    zip.start_file("crash_info.json", options).unwrap();
    zip.write_all(serde_json::json!({"crash_id": crash_id, "job_id": job_id}).to_string().as_bytes()).unwrap();

    zip.start_file("testcase/input.bin", options).unwrap();
    zip.write_all(testcase_bytes).unwrap();

    zip.finish().unwrap();
}

#[test]
fn from_crash_id_uses_the_testcase_on_disk_when_it_still_exists() {
    let root = tempfile::tempdir().unwrap();
    let store = Store::open_in_memory().unwrap();
    let clock = FakeClock::default();

    let job_id = JobId::new(1);
    let job = Job::new(job_id, sample_job_config(), &clock);
    store.insert_job(&job).unwrap();

    let testcase_path = root.path().join("seed_that_crashed.bin");
    std::fs::write(&testcase_path, b"AAAA").unwrap();

    let crash = sample_crash(job_id, testcase_path.clone(), None);
    store.insert_crash(&crash).unwrap();

    let target = from_crash_id(&store, CrashId::new(1), &root.path().join("scratch")).unwrap();
    assert_eq!(target.job_id, job_id);
    assert_eq!(target.disk_image, PathBuf::from("/images/target.qcow2"));
    assert_eq!(target.snapshot_name, Some("clean".to_string()));
    assert_eq!(target.testcase_path, testcase_path);
}

#[test]
fn from_crash_id_falls_back_to_the_archive_when_the_testcase_is_gone() {
    let root = tempfile::tempdir().unwrap();
    let store = Store::open_in_memory().unwrap();
    let clock = FakeClock::default();

    let job_id = JobId::new(1);
    let job = Job::new(job_id, sample_job_config(), &clock);
    store.insert_job(&job).unwrap();

    let archive_path = root.path().join("crash_1_0.zip");
    write_archive(&archive_path, 1, 1, b"BBBB");

    let gone_path = root.path().join("does_not_exist.bin");
    let crash = sample_crash(job_id, gone_path, Some(archive_path));
    store.insert_crash(&crash).unwrap();

    let scratch = root.path().join("scratch");
    let target = from_crash_id(&store, CrashId::new(1), &scratch).unwrap();
    assert_eq!(std::fs::read(&target.testcase_path).unwrap(), b"BBBB");
}

#[test]
fn from_crash_id_reports_unknown_crash() {
    let store = Store::open_in_memory().unwrap();
    let err = from_crash_id(&store, CrashId::new(99), Path::new("/tmp/scratch")).unwrap_err();
    assert!(matches!(err, ReplayError::UnknownCrash(99)));
}

#[test]
fn from_archive_resolves_the_job_through_the_store_when_no_override_is_given() {
    let root = tempfile::tempdir().unwrap();
    let store = Store::open_in_memory().unwrap();
    let clock = FakeClock::default();

    let job_id = JobId::new(7);
    let job = Job::new(job_id, sample_job_config(), &clock);
    store.insert_job(&job).unwrap();

    let archive_path = root.path().join("crash_7_0.zip");
    write_archive(&archive_path, 7, 3, b"CCCC");

    let scratch = root.path().join("scratch");
    let target = from_archive(&archive_path, Some(&store), None, &scratch).unwrap();
    assert_eq!(target.job_id, job_id);
    assert_eq!(target.crash_id, Some(CrashId::new(3)));
    assert_eq!(target.disk_image, PathBuf::from("/images/target.qcow2"));
    assert_eq!(std::fs::read(&target.testcase_path).unwrap(), b"CCCC");
}

#[test]
fn from_archive_honors_an_explicit_disk_image_override() {
    let root = tempfile::tempdir().unwrap();
    let archive_path = root.path().join("crash_7_0.zip");
    write_archive(&archive_path, 7, 3, b"DDDD");

    let scratch = root.path().join("scratch");
    let override_image = PathBuf::from("/moved/target.qcow2");
    let target = from_archive(&archive_path, None, Some((override_image.clone(), Some("clean".to_string()))), &scratch).unwrap();
    assert_eq!(target.disk_image, override_image);
    assert_eq!(target.snapshot_name, Some("clean".to_string()));
}
