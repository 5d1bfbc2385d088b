// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types emitted by every state-changing operation.
//!
//! These are not the durability mechanism (the SQL store in `vmfuzz-store`
//! is the system of record) — they are the uniform seam through which
//! `tracing` spans and operator-facing summaries are produced, the same
//! role events play in the source's central `logger.py`.

use crate::id::{CrashId, JobId, TestCaseId, VmId};
use crate::job::JobStatus;
use serde::{Deserialize, Serialize};

/// Serializes with `{"type": "event_name", ...fields}`. Unknown tags are
/// rejected rather than silently dropped: an event log is only useful if
/// every emitted event is recognized by whatever reads it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    VmSpawned {
        vm_id: VmId,
        pid: u32,
        arch: String,
    },
    VmStopped {
        vm_id: VmId,
        forced: bool,
    },
    SnapshotReverted {
        vm_id: VmId,
        snapshot: String,
        fast_path: bool,
    },
    TestCaseRecorded {
        testcase_id: TestCaseId,
        job_id: JobId,
        vm_id: VmId,
        duration_ms: f64,
    },
    CrashRecorded {
        crash_id: CrashId,
        job_id: JobId,
        is_unique: bool,
        duplicate_count: u64,
    },
    JobStatusChanged {
        job_id: JobId,
        status: JobStatus,
    },
    DispatchJobPushed {
        job_id: JobId,
        worker: String,
        package_bytes: u64,
    },
    DispatchCrashesPulled {
        job_id: JobId,
        worker: String,
        count: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_tag_round_trips() {
        let event = Event::VmSpawned {
            vm_id: VmId::new(3),
            pid: 100,
            arch: "x86_64".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "vm_spawned");
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let json = serde_json::json!({"type": "made_up_event"});
        let result: Result<Event, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }
}
