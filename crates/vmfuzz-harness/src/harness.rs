// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-VM fuzzing loop: revert to snapshot, pull a mutated test case,
//! drive the debug stub for one outcome, run the crash pipeline on a hit,
//! and feed the result back to the mutation engine.

use crate::error::HarnessError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use vmfuzz_config::{Registry, ResourceAccountant, SystemStatsSampler};
use vmfuzz_core::{Clock, Crash, CrashId, Exploitability, Job, JobId, TestCase, TestCaseId, VmId, VmRecord};
use vmfuzz_crash::{self as crash_pipeline, ArtifactInputs, RawCrashReport};
use vmfuzz_debugstub::DebugOutcome;
use vmfuzz_emulator::{DisplayMode, ShareTransport, SpawnRequest};
use vmfuzz_mutate::MutationEngine;
use vmfuzz_store::Store;

/// Everything about the job that stays fixed for the harness's lifetime.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub arch: String,
    pub disk_image: PathBuf,
    pub snapshot_name: Option<String>,
    pub share_transport: ShareTransport,
    pub display: DisplayMode,
    pub enable_time_compression: bool,
    pub max_parallel_vms: u32,
    pub session_timeout: Duration,
    pub crash_dir: PathBuf,
    pub vm_scratch_root: PathBuf,
    /// Number of iterations between fair-share recomputations.
    pub rebalance_every: u32,
}

/// Outcome of a single test-case iteration, returned so the caller (the
/// `run` loop, or a single-shot replay driver) can decide what to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// A test case ran; no crash.
    Ran,
    /// A test case ran and produced a (possibly duplicate) crash.
    Crashed { crash_id_is_new: bool },
    /// The mutation engine has no more test cases to offer.
    EndOfStream,
}

pub struct Harness {
    job: Job,
    config: HarnessConfig,
    accountant: Arc<ResourceAccountant>,
    sampler: Box<dyn SystemStatsSampler>,
    registry: Registry,
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    engine: MutationEngine,
    vms: Vec<VmId>,
    pid: u32,
    iterations_since_rebalance: u32,
    next_scratch_index: u32,
    next_testcase_id: AtomicI64,
    next_crash_id: AtomicI64,
}

impl Harness {
    pub fn new(
        job: Job,
        config: HarnessConfig,
        corpus_dir: &Path,
        mutate_output_dir: &Path,
        accountant: Arc<ResourceAccountant>,
        sampler: Box<dyn SystemStatsSampler>,
        registry: Registry,
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, HarnessError> {
        let pid = std::process::id();
        accountant.register_instance(pid)?;
        let engine = MutationEngine::new(corpus_dir, mutate_output_dir)?;
        Ok(Self {
            job,
            config,
            accountant,
            sampler,
            registry,
            store,
            clock,
            engine,
            vms: Vec::new(),
            pid,
            iterations_since_rebalance: 0,
            next_scratch_index: 0,
            next_testcase_id: AtomicI64::new(1),
            next_crash_id: AtomicI64::new(1),
        })
    }

    fn alloc_testcase_id(&self) -> TestCaseId {
        TestCaseId::new(self.next_testcase_id.fetch_add(1, Ordering::SeqCst))
    }

    fn alloc_crash_id(&self) -> CrashId {
        CrashId::new(self.next_crash_id.fetch_add(1, Ordering::SeqCst))
    }

    pub fn job_id(&self) -> JobId {
        self.job.id
    }

    fn spawn_request(&self, share_dir: PathBuf) -> SpawnRequest {
        SpawnRequest {
            arch: self.config.arch.clone(),
            disk_image: self.config.disk_image.clone(),
            snapshot_name: self.config.snapshot_name.clone(),
            share_dir,
            share_transport: self.config.share_transport,
            display: self.config.display,
            enable_time_compression: self.config.enable_time_compression,
            extra_args: Vec::new(),
        }
    }

    /// Acquires a resource-accountant slot, spawns a VM, and registers it.
    #[instrument(skip(self))]
    pub async fn acquire_vm(&mut self) -> Result<VmId, HarnessError> {
        if !self.accountant.register_vms(1)? {
            return Err(HarnessError::NoVmSlotAvailable);
        }
        let scratch_index = self.next_scratch_index;
        self.next_scratch_index += 1;
        let share_dir = self.config.vm_scratch_root.join(format!("vm-{scratch_index}")).join("share");
        let req = self.spawn_request(share_dir);

        let running = self.vms.len() as u32;
        let spawned = match vmfuzz_emulator::start_vm(VmId::new(0), self.config.max_parallel_vms, running, req).await {
            Ok(spawned) => spawned,
            Err(err) => {
                self.accountant.unregister_vms(1)?;
                return Err(err.into());
            }
        };

        let mut record = spawned.record;
        record.current_job = Some(self.job.id);
        let id = self.registry.add_vm(record)?;
        self.vms.push(id);
        info!(vm_id = %id, "acquired VM");
        Ok(id)
    }

    /// Stops and releases a VM this harness owns.
    #[instrument(skip(self))]
    pub async fn release_vm(&mut self, id: VmId) -> Result<(), HarnessError> {
        if let Some(mut record) = self.registry.get(id)? {
            vmfuzz_emulator::stop_vm(&mut record, true).await?;
            self.registry.remove_vm(id)?;
        }
        self.vms.retain(|vm| *vm != id);
        self.accountant.unregister_vms(1)?;
        Ok(())
    }

    /// Runs steps 2-7 of one per-VM iteration. Returns [`IterationOutcome::EndOfStream`]
    /// once the mutation engine has exhausted every seed's energy budget.
    #[instrument(skip(self))]
    pub async fn run_iteration(&mut self, id: VmId) -> Result<IterationOutcome, HarnessError> {
        let mut record = self.registry.get(id)?.ok_or(HarnessError::UnknownVm(id.get()))?;

        if record.snapshot_name.is_some() {
            let req = self.spawn_request(record.share_dir.clone());
            if let Some(spawned) = vmfuzz_emulator::revert_to_snapshot(&mut record, req).await? {
                record = spawned.record;
            }
            self.registry.update_vm(&record)?;
        }

        let testcase_path = {
            let mut rng = rand::rng();
            let Some(testcase_path) = self.engine.next_testcase(None, &mut rng)? else {
                return Ok(IterationOutcome::EndOfStream);
            };
            testcase_path
        };

        let input_bytes = std::fs::read(&testcase_path)?;
        std::fs::create_dir_all(&record.share_dir)?;
        let fuzz_input_path = record.share_dir.join("fuzz_input.bin");
        std::fs::write(&fuzz_input_path, &input_bytes)?;
        record.current_test = Some(testcase_path.clone());
        self.registry.update_vm(&record)?;

        let start_ms = self.clock.epoch_ms();
        let profile = vmfuzz_emulator::lookup_arch(&record.arch)?;
        let outcome = vmfuzz_debugstub::run_session(
            &profile,
            record.ports.debug_stub,
            record.ports.guest_agent,
            self.config.session_timeout,
        )
        .await?;
        let duration_ms = (self.clock.epoch_ms().saturating_sub(start_ms)) as f64;

        let crash_result = match &outcome {
            DebugOutcome::NoCrash => None,
            DebugOutcome::Kernel { signal, frames, raw_output } => Some(RawCrashReport {
                kind: "kernel".to_string(),
                detail: signal.clone(),
                backtrace: Some(frames.clone()),
                crash_address: None,
                instruction_pointer: None,
                raw_output: raw_output.clone(),
            }),
            DebugOutcome::User(report) => Some(RawCrashReport {
                kind: "user".to_string(),
                detail: report.exception.clone().unwrap_or_else(|| "unknown".to_string()),
                backtrace: None,
                crash_address: None,
                instruction_pointer: None,
                raw_output: serde_json::to_string(report).unwrap_or_default(),
            }),
        };

        let outcome_result = if let Some(raw) = crash_result {
            let is_new = self.handle_crash(&record, &testcase_path, &input_bytes, &raw)?;
            self.engine.record_crash(&testcase_path, &input_bytes);
            IterationOutcome::Crashed { crash_id_is_new: is_new }
        } else {
            IterationOutcome::Ran
        };

        let testcase = TestCase {
            id: self.alloc_testcase_id(),
            job_id: self.job.id,
            vm_id: id,
            path: testcase_path,
            start_time_ms: start_ms,
            duration_ms,
        };
        self.store.insert_testcase(&testcase)?;
        self.job.record_testcase_generated();
        self.store.record_testcase_generated(self.job.id)?;

        Ok(outcome_result)
    }

    fn handle_crash(
        &self,
        vm: &VmRecord,
        testcase_path: &Path,
        _input_bytes: &[u8],
        raw: &RawCrashReport,
    ) -> Result<bool, HarnessError> {
        let analysis = crash_pipeline::analyze(raw);
        let timestamp_ms = self.clock.epoch_ms();

        let crash_id = self.alloc_crash_id();
        let artifact_path = crash_pipeline::package(
            &self.config.crash_dir,
            &ArtifactInputs {
                crash_id,
                job_id: self.job.id,
                timestamp_ms,
                kind: &raw.kind,
                detail: &raw.detail,
                signature: analysis.signature.value(),
                crash_address: raw.crash_address.as_deref(),
                testcase_path,
                share_dir: Some(vm.share_dir.as_path()),
                backtrace: raw.backtrace.as_deref(),
                sanitizer: analysis.sanitizer.as_ref(),
            },
        )?;

        let crash = Crash {
            id: crash_id,
            job_id: self.job.id,
            testcase_path: testcase_path.to_path_buf(),
            kind: raw.kind.clone(),
            detail: raw.detail.clone(),
            signature: analysis.signature.value().to_string(),
            exploitability: analysis.exploitability,
            artifact_path: Some(artifact_path),
            timestamp_ms,
            duplicate_count: 0,
            backtrace: raw.backtrace.clone(),
            crash_address: raw.crash_address.clone(),
            sanitizer_kind: analysis.sanitizer.as_ref().map(|s| s.kind),
            sanitizer_report: analysis.sanitizer.as_ref().map(|s| s.raw.clone()),
            severity: analysis.severity,
            is_unique: true,
        };
        let was_high_value = matches!(crash.exploitability, Exploitability::High | Exploitability::Medium);
        let persisted_id = self.store.insert_crash(&crash)?;
        let is_new = persisted_id == crash_id;
        warn!(job_id = %self.job.id, signature = %crash.signature, high_value = was_high_value, is_new, "crash recorded");
        Ok(is_new)
    }

    /// Recomputes fair share against the accountant's current headroom and
    /// scales this harness's live VM population toward it.
    #[instrument(skip(self))]
    pub async fn rebalance(&mut self) -> Result<(), HarnessError> {
        let stats = self.sampler.sample();
        let total_max = self.accountant.total_max_vms(stats);
        let share = self.accountant.fair_share(total_max)?;

        while self.vms.len() as u32 > share {
            if let Some(id) = self.vms.last().copied() {
                self.release_vm(id).await?;
            } else {
                break;
            }
        }
        while (self.vms.len() as u32) < share {
            match self.acquire_vm().await {
                Ok(_) => {}
                Err(HarnessError::NoVmSlotAvailable) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Drives the fuzzing loop until the mutation engine reports end of
    /// stream across every live VM, periodically rebalancing.
    pub async fn run(&mut self) -> Result<(), HarnessError> {
        if self.vms.is_empty() {
            self.acquire_vm().await?;
        }

        loop {
            let mut any_progress = false;
            for id in self.vms.clone() {
                match self.run_iteration(id).await {
                    Ok(IterationOutcome::EndOfStream) => {}
                    Ok(_) => any_progress = true,
                    Err(err) => {
                        warn!(vm_id = %id, %err, "iteration failed");
                    }
                }
            }
            if !any_progress {
                break;
            }

            self.iterations_since_rebalance += 1;
            if self.iterations_since_rebalance >= self.config.rebalance_every {
                self.iterations_since_rebalance = 0;
                self.rebalance().await?;
            }
        }
        Ok(())
    }

    /// Stops every owned VM, releases its slot, unregisters this process
    /// instance from the accountant. Called on every exit path.
    pub async fn shutdown(&mut self) -> Result<(), HarnessError> {
        for id in self.vms.clone() {
            self.release_vm(id).await?;
        }
        self.accountant.unregister_instance(self.pid)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "harness_tests.rs"]
mod tests;
