// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The controller's view of its fleet: one entry per worker, an address and
//! a liveness/load status kept current by the poll loop's `STATUS_REQUEST`
//! round trips.

use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Idle,
    Busy,
    Offline,
}

#[derive(Debug, Clone)]
pub struct WorkerEntry {
    pub address: String,
    pub status: WorkerStatus,
}

/// Thread-safe worker roster shared between the controller's poll loop and
/// anything inspecting fleet state (status CLI, metrics).
#[derive(Default)]
pub struct WorkerTable {
    workers: RwLock<HashMap<String, WorkerEntry>>,
}

impl WorkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: impl Into<String>, address: impl Into<String>) {
        self.workers.write().insert(id.into(), WorkerEntry { address: address.into(), status: WorkerStatus::Idle });
    }

    pub fn set_status(&self, id: &str, status: WorkerStatus) {
        if let Some(entry) = self.workers.write().get_mut(id) {
            entry.status = status;
        }
    }

    /// Marks every worker offline the health sweep did not hear back from.
    pub fn mark_offline(&self, id: &str) {
        self.set_status(id, WorkerStatus::Offline);
    }

    /// First idle worker by insertion order, or `None` if the whole fleet
    /// is busy or offline.
    pub fn pick_idle(&self) -> Option<(String, String)> {
        self.workers
            .read()
            .iter()
            .find(|(_, entry)| entry.status == WorkerStatus::Idle)
            .map(|(id, entry)| (id.clone(), entry.address.clone()))
    }

    pub fn address_of(&self, id: &str) -> Option<String> {
        self.workers.read().get(id).map(|e| e.address.clone())
    }

    pub fn snapshot(&self) -> HashMap<String, WorkerEntry> {
        self.workers.read().clone()
    }
}

#[cfg(test)]
#[path = "worker_table_tests.rs"]
mod tests;
