// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single embedded SQLite database per node. All writes are serialized on
//! one connection guarded by a mutex in-process; the store is reference
//! counted (`Arc<Store>`) so the harness's cleanup path can drop its handle
//! without force-closing a connection other threads may still be using.

use crate::error::StoreError;
use crate::schema;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use vmfuzz_core::{Crash, CrashId, Exploitability, Job, JobId, JobStatus, SanitizerKind, Severity, StackFrame, TestCase};

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Arc<Self>, StoreError> {
        let conn = Connection::open(path)?;
        schema::open_and_migrate(&conn)?;
        Ok(Arc::new(Self { conn: Mutex::new(conn) }))
    }

    pub fn open_in_memory() -> Result<Arc<Self>, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::open_and_migrate(&conn)?;
        Ok(Arc::new(Self { conn: Mutex::new(conn) }))
    }

    pub fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO jobs (id, name, disk_image, snapshot_name, fuzzer_kind, fuzzer_config, created_at_ms, status, total_testcases, generated_testcases, vm_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                job.id.get(),
                job.name,
                job.disk_image.to_string_lossy(),
                job.snapshot_name,
                job.fuzzer_kind,
                job.fuzzer_config.to_string(),
                job.created_at_ms as i64,
                job.status.to_string(),
                job.counters.total_testcases.map(|v| v as i64),
                job.counters.generated_testcases as i64,
                job.counters.vm_count as i64,
            ],
        )?;
        Ok(())
    }

    pub fn update_job_status(&self, id: JobId, status: JobStatus) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE jobs SET status = ?1 WHERE id = ?2",
            params![status.to_string(), id.get()],
        )?;
        Ok(())
    }

    pub fn set_total_testcases_once(&self, id: JobId, total: u64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE jobs SET total_testcases = ?1 WHERE id = ?2 AND total_testcases IS NULL",
            params![total as i64, id.get()],
        )?;
        Ok(())
    }

    pub fn record_testcase_generated(&self, id: JobId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE jobs SET generated_testcases = generated_testcases + 1 WHERE id = ?1",
            params![id.get()],
        )?;
        Ok(())
    }

    pub fn get_job(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, disk_image, snapshot_name, fuzzer_kind, fuzzer_config, created_at_ms, status, total_testcases, generated_testcases, vm_count
             FROM jobs WHERE id = ?1",
            params![id.get()],
            row_to_job,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn delete_job(&self, id: JobId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM jobs WHERE id = ?1", params![id.get()])?;
        Ok(())
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, disk_image, snapshot_name, fuzzer_kind, fuzzer_config, created_at_ms, status, total_testcases, generated_testcases, vm_count
             FROM jobs ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_job)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn insert_testcase(&self, testcase: &TestCase) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO testcases (id, job_id, vm_id, path, start_time_ms, duration_ms) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                testcase.id.get(),
                testcase.job_id.get(),
                testcase.vm_id.get(),
                testcase.path.to_string_lossy(),
                testcase.start_time_ms as i64,
                testcase.duration_ms,
            ],
        )?;
        Ok(())
    }

    /// Inserts a crash, or increments the `duplicate_count` of an existing
    /// row with the same `(job_id, signature)` pair. Race-free: the
    /// conflict resolution happens inside SQLite's own upsert, not a
    /// read-then-write round trip from this process.
    ///
    /// `stack_hash` mirrors `signature` (the domain type carries one dedup
    /// key, not both); the column survives as a separate migration target
    /// because forensic tooling queries it directly without the kind salt.
    pub fn insert_crash(&self, crash: &Crash) -> Result<CrashId, StoreError> {
        let conn = self.conn.lock();
        let backtrace_json = match &crash.backtrace {
            Some(frames) => Some(serde_json::to_string(frames)?),
            None => None,
        };
        let sanitizer_kind = crash.sanitizer_kind.map(|k| k.as_str());
        let severity = crash.severity.map(|s| format!("{s:?}"));

        let id: i64 = conn.query_row(
            "INSERT INTO crashes (
                id, job_id, testcase_path, kind, detail, signature, exploitability,
                artifact_path, timestamp_ms, duplicate_count, stack_hash, backtrace_json,
                crash_address, sanitizer_type, sanitizer_report, severity, is_unique
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?6, ?10, ?11, ?12, ?13, ?14, 1)
             ON CONFLICT(job_id, signature) DO UPDATE SET duplicate_count = duplicate_count + 1
             RETURNING id",
            params![
                crash.id.get(),
                crash.job_id.get(),
                crash.testcase_path.to_string_lossy(),
                crash.kind,
                crash.detail,
                crash.signature,
                format!("{:?}", crash.exploitability).to_uppercase(),
                crash.artifact_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                crash.timestamp_ms as i64,
                backtrace_json,
                crash.crash_address,
                sanitizer_kind,
                crash.sanitizer_report,
                severity,
            ],
            |row| row.get(0),
        )?;
        Ok(CrashId::new(id))
    }

    pub fn get_crash(&self, id: CrashId) -> Result<Option<Crash>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, job_id, testcase_path, kind, detail, signature, exploitability, artifact_path,
                    timestamp_ms, duplicate_count, backtrace_json, crash_address, sanitizer_type,
                    sanitizer_report, severity, is_unique
             FROM crashes WHERE id = ?1",
            params![id.get()],
            row_to_crash,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn list_crashes_for_job(&self, job_id: JobId) -> Result<Vec<Crash>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, job_id, testcase_path, kind, detail, signature, exploitability, artifact_path,
                    timestamp_ms, duplicate_count, backtrace_json, crash_address, sanitizer_type,
                    sanitizer_report, severity, is_unique
             FROM crashes WHERE job_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![job_id.get()], row_to_crash)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let status: String = row.get(7)?;
    let fuzzer_config: String = row.get(5)?;
    Ok(Job {
        id: JobId::new(row.get(0)?),
        name: row.get(1)?,
        disk_image: row.get::<_, String>(2)?.into(),
        snapshot_name: row.get(3)?,
        fuzzer_kind: row.get(4)?,
        fuzzer_config: serde_json::from_str(&fuzzer_config).unwrap_or(serde_json::Value::Null),
        created_at_ms: row.get::<_, i64>(6)? as u64,
        status: parse_job_status(&status),
        counters: vmfuzz_core::JobCounters {
            total_testcases: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
            generated_testcases: row.get::<_, i64>(9)? as u64,
            vm_count: row.get::<_, i64>(10)? as u32,
        },
    })
}

fn parse_job_status(s: &str) -> JobStatus {
    match s {
        "running" => JobStatus::Running,
        "paused" => JobStatus::Paused,
        "stopped" => JobStatus::Stopped,
        "completed" => JobStatus::Completed,
        _ => JobStatus::Pending,
    }
}

fn row_to_crash(row: &rusqlite::Row<'_>) -> rusqlite::Result<Crash> {
    let exploitability: String = row.get(6)?;
    let backtrace_json: Option<String> = row.get(10)?;
    let backtrace: Option<Vec<StackFrame>> = backtrace_json
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok());
    let sanitizer_type: Option<String> = row.get(12)?;
    let severity: Option<String> = row.get(14)?;
    Ok(Crash {
        id: CrashId::new(row.get(0)?),
        job_id: JobId::new(row.get(1)?),
        testcase_path: row.get::<_, String>(2)?.into(),
        kind: row.get(3)?,
        detail: row.get(4)?,
        signature: row.get(5)?,
        exploitability: parse_exploitability(&exploitability),
        artifact_path: row.get::<_, Option<String>>(7)?.map(Into::into),
        timestamp_ms: row.get::<_, i64>(8)? as u64,
        duplicate_count: row.get::<_, i64>(9)? as u64,
        backtrace,
        crash_address: row.get(11)?,
        sanitizer_kind: sanitizer_type.as_deref().and_then(parse_sanitizer_kind),
        sanitizer_report: row.get(13)?,
        severity: severity.as_deref().and_then(parse_severity),
        is_unique: row.get::<_, i64>(15)? != 0,
    })
}

fn parse_exploitability(s: &str) -> Exploitability {
    match s {
        "HIGH" => Exploitability::High,
        "MEDIUM" => Exploitability::Medium,
        "LOW" => Exploitability::Low,
        _ => Exploitability::Unknown,
    }
}

fn parse_sanitizer_kind(s: &str) -> Option<SanitizerKind> {
    match s {
        "asan" => Some(SanitizerKind::Address),
        "tsan" => Some(SanitizerKind::Thread),
        "msan" => Some(SanitizerKind::Memory),
        "ubsan" => Some(SanitizerKind::UndefinedBehavior),
        "lsan" => Some(SanitizerKind::Leak),
        _ => None,
    }
}

fn parse_severity(s: &str) -> Option<Severity> {
    match s {
        "Critical" => Some(Severity::Critical),
        "High" => Some(Severity::High),
        "Medium" => Some(Severity::Medium),
        "Low" => Some(Severity::Low),
        _ => None,
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
