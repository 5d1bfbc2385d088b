// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental schema migration: inspects `PRAGMA table_info` and issues
//! `ALTER TABLE ... ADD COLUMN` for whatever is missing. There is no
//! migration-version table by design — each table's own column set is the
//! source of truth, mirroring the original schema's evolution exactly.

use rusqlite::Connection;
use std::collections::HashSet;

const CREATE_JOBS: &str = "
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    disk_image TEXT NOT NULL,
    snapshot_name TEXT,
    fuzzer_kind TEXT NOT NULL,
    fuzzer_config TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    status TEXT NOT NULL,
    total_testcases INTEGER,
    generated_testcases INTEGER NOT NULL DEFAULT 0
)";

const CREATE_TESTCASES: &str = "
CREATE TABLE IF NOT EXISTS testcases (
    id INTEGER PRIMARY KEY,
    job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    vm_id INTEGER NOT NULL,
    path TEXT NOT NULL,
    start_time_ms INTEGER NOT NULL,
    duration_ms REAL NOT NULL
)";

const CREATE_CRASHES: &str = "
CREATE TABLE IF NOT EXISTS crashes (
    id INTEGER PRIMARY KEY,
    job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    testcase_path TEXT NOT NULL,
    kind TEXT NOT NULL,
    detail TEXT NOT NULL,
    signature TEXT NOT NULL,
    exploitability TEXT NOT NULL,
    artifact_path TEXT,
    timestamp_ms INTEGER NOT NULL,
    duplicate_count INTEGER NOT NULL DEFAULT 0
)";

/// `(table, column, add-column-clause)`; applied in order, skipped when the
/// column is already present.
const MIGRATED_COLUMNS: &[(&str, &str, &str)] = &[
    ("jobs", "vm_count", "ALTER TABLE jobs ADD COLUMN vm_count INTEGER NOT NULL DEFAULT 0"),
    ("crashes", "stack_hash", "ALTER TABLE crashes ADD COLUMN stack_hash TEXT"),
    ("crashes", "backtrace_json", "ALTER TABLE crashes ADD COLUMN backtrace_json TEXT"),
    ("crashes", "crash_address", "ALTER TABLE crashes ADD COLUMN crash_address TEXT"),
    ("crashes", "sanitizer_type", "ALTER TABLE crashes ADD COLUMN sanitizer_type TEXT"),
    ("crashes", "sanitizer_report", "ALTER TABLE crashes ADD COLUMN sanitizer_report TEXT"),
    ("crashes", "severity", "ALTER TABLE crashes ADD COLUMN severity TEXT"),
    (
        "crashes",
        "is_unique",
        "ALTER TABLE crashes ADD COLUMN is_unique INTEGER NOT NULL DEFAULT 1",
    ),
];

pub fn open_and_migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(CREATE_JOBS, [])?;
    conn.execute(CREATE_TESTCASES, [])?;
    conn.execute(CREATE_CRASHES, [])?;

    for (table, column, add_clause) in MIGRATED_COLUMNS {
        if !has_column(conn, table, column)? {
            conn.execute(add_clause, [])?;
        }
    }

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_crashes_job_signature ON crashes(job_id, signature)",
        [],
    )?;
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut existing: HashSet<String> = HashSet::new();
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        existing.insert(row?);
    }
    Ok(existing.contains(column))
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
