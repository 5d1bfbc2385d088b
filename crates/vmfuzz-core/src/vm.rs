// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VM record: the emulator manager's view of one running or stopped instance.

use crate::id::{JobId, VmId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Status of a VM record. `Stopped` is terminal for a given [`VmId`]: a VM
/// that needs to run again gets a fresh id from a new spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmStatus {
    Running,
    Stopped,
}

/// The three TCP ports every spawned emulator instance opens, plus an
/// optional VNC port used only when screenshots are enabled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VmPorts {
    pub debug_stub: u16,
    pub monitor: u16,
    pub guest_agent: u16,
    pub vnc: Option<u16>,
}

/// A VM instance tracked by the emulator manager's registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmRecord {
    pub id: VmId,
    pub pid: u32,
    pub arch: String,
    pub disk_image: PathBuf,
    pub share_dir: PathBuf,
    pub ports: VmPorts,
    pub snapshot_name: Option<String>,
    pub status: VmStatus,
    pub current_job: Option<JobId>,
    pub current_test: Option<PathBuf>,
}

impl VmRecord {
    pub fn mark_stopped(&mut self) {
        self.status = VmStatus::Stopped;
    }

    pub fn is_running(&self) -> bool {
        self.status == VmStatus::Running
    }
}
