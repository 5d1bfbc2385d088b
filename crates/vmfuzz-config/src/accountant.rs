// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process fair-share accounting of VM slots.
//!
//! Every cooperating `vmfuzzd` process consults the same
//! `<state-dir>/accountant.json` document under an advisory lock before
//! spawning or releasing VMs. Nothing prevents a rogue process from
//! ignoring the accountant; the guarantee only holds if every participant
//! consults it.

use crate::error::AccountantError;
use crate::lockfile::{write_atomic, FileLock};
use crate::system_stats::{SystemStats, SystemStatsSampler};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Policy knobs controlling how much headroom is reserved for the rest of
/// the system before any VM slots are offered.
#[derive(Debug, Clone, Copy)]
pub struct AccountantPolicy {
    pub cpu_percent_per_vm: f64,
    pub ram_mb_per_vm: f64,
    pub min_cpu_free_percent: f64,
    pub min_ram_free_mb: f64,
}

impl Default for AccountantPolicy {
    fn default() -> Self {
        Self {
            cpu_percent_per_vm: 25.0,
            ram_mb_per_vm: 1024.0,
            min_cpu_free_percent: 10.0,
            min_ram_free_mb: 1024.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountantState {
    #[serde(default)]
    instances: Vec<u32>,
    #[serde(default)]
    current_vms: u32,
}

impl Default for AccountantState {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            current_vms: 0,
        }
    }
}

pub struct ResourceAccountant {
    path: PathBuf,
    lock_path: PathBuf,
    policy: AccountantPolicy,
    sampler: Box<dyn SystemStatsSampler>,
    is_pid_alive: Box<dyn Fn(u32) -> bool + Send + Sync>,
}

impl ResourceAccountant {
    pub fn new(state_dir: &Path, policy: AccountantPolicy, sampler: Box<dyn SystemStatsSampler>) -> Self {
        let path = state_dir.join("accountant.json");
        let lock_path = path.with_extension("json.lock");
        Self {
            path,
            lock_path,
            policy,
            sampler,
            is_pid_alive: Box::new(default_is_pid_alive),
        }
    }

    #[cfg(test)]
    pub fn with_pid_checker(mut self, checker: impl Fn(u32) -> bool + Send + Sync + 'static) -> Self {
        self.is_pid_alive = Box::new(checker);
        self
    }

    fn read(&self) -> Result<AccountantState, AccountantError> {
        if !self.path.exists() {
            return Ok(AccountantState::default());
        }
        let bytes = std::fs::read(&self.path).map_err(|e| AccountantError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        if bytes.is_empty() {
            return Ok(AccountantState::default());
        }
        serde_json::from_slice(&bytes).map_err(|e| AccountantError::Parse {
            path: self.path.clone(),
            source: e,
        })
    }

    fn write(&self, state: &AccountantState) -> Result<(), AccountantError> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| AccountantError::Parse {
            path: self.path.clone(),
            source: e,
        })?;
        write_atomic(&self.path, &bytes).map_err(|e| AccountantError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    fn lock(&self) -> Result<FileLock, AccountantError> {
        FileLock::acquire_exclusive(&self.lock_path).map_err(|(p, e)| AccountantError::LockFailed(p, e))
    }

    /// Sweeps dead pids out of `state.instances`, returning the cleaned state.
    fn sweep(&self, mut state: AccountantState) -> AccountantState {
        state.instances.retain(|pid| (self.is_pid_alive)(*pid));
        state
    }

    pub fn register_instance(&self, pid: u32) -> Result<(), AccountantError> {
        let _guard = self.lock()?;
        let mut state = self.sweep(self.read()?);
        if !state.instances.contains(&pid) {
            state.instances.push(pid);
        }
        self.write(&state)
    }

    pub fn unregister_instance(&self, pid: u32) -> Result<(), AccountantError> {
        let _guard = self.lock()?;
        let mut state = self.sweep(self.read()?);
        state.instances.retain(|p| *p != pid);
        self.write(&state)
    }

    /// Current number of live cooperating instances, with dead pids swept.
    pub fn instance_count(&self) -> Result<usize, AccountantError> {
        let _guard = self.lock()?;
        let state = self.sweep(self.read()?);
        self.write(&state)?;
        Ok(state.instances.len().max(1))
    }

    pub fn total_max_vms(&self, stats: SystemStats) -> u32 {
        let cpu_free = (100.0 - stats.cpu_percent_used - self.policy.min_cpu_free_percent).max(0.0);
        let ram_free = (stats.memory_total_mb - stats.memory_used_mb - self.policy.min_ram_free_mb).max(0.0);
        let cpu_max = (cpu_free / self.policy.cpu_percent_per_vm) as u32;
        let ram_max = (ram_free / self.policy.ram_mb_per_vm) as u32;
        cpu_max.min(ram_max)
    }

    /// Atomically reserves `count` additional slots iff the reservation
    /// would not exceed `total_max_vms`. Returns whether the reservation
    /// succeeded.
    pub fn register_vms(&self, count: u32) -> Result<bool, AccountantError> {
        let stats = self.sampler.sample();
        let total_max = self.total_max_vms(stats);
        let _guard = self.lock()?;
        let mut state = self.read()?;
        if state.current_vms + count <= total_max {
            state.current_vms += count;
            self.write(&state)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Releases `count` slots, floored at zero.
    pub fn unregister_vms(&self, count: u32) -> Result<(), AccountantError> {
        let _guard = self.lock()?;
        let mut state = self.read()?;
        state.current_vms = state.current_vms.saturating_sub(count);
        self.write(&state)
    }

    pub fn current_vms(&self) -> Result<u32, AccountantError> {
        Ok(self.read()?.current_vms)
    }

    /// `total_max // max(1, instance_count)`.
    pub fn fair_share(&self, total_max: u32) -> Result<u32, AccountantError> {
        let instance_count = self.instance_count()?.max(1) as u32;
        Ok(total_max / instance_count)
    }
}

/// `kill(pid, 0)` without linking libc directly: `/proc/<pid>` existing is
/// the same liveness check on Linux, and sidesteps the workspace-wide ban
/// on unsafe code for a single syscall this narrow.
fn default_is_pid_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(test)]
#[path = "accountant_tests.rs"]
mod tests;
