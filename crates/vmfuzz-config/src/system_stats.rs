// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source of CPU/RAM headroom for the resource accountant. The production
//! implementation samples `/proc/stat` and `/proc/meminfo` the way the
//! source samples via `psutil`; tests inject a fixed reading instead.

use std::io::Read;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemStats {
    pub cpu_percent_used: f64,
    pub memory_total_mb: f64,
    pub memory_used_mb: f64,
}

pub trait SystemStatsSampler: Send + Sync {
    fn sample(&self) -> SystemStats;
}

/// Samples `/proc/stat` twice across a short interval to estimate CPU
/// utilization, and `/proc/meminfo` once for memory headroom.
pub struct LinuxSystemStatsSampler {
    pub interval: Duration,
}

impl Default for LinuxSystemStatsSampler {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
        }
    }
}

impl SystemStatsSampler for LinuxSystemStatsSampler {
    fn sample(&self) -> SystemStats {
        let before = read_cpu_ticks().unwrap_or_default();
        std::thread::sleep(self.interval);
        let after = read_cpu_ticks().unwrap_or_default();

        let total_delta = after.total.saturating_sub(before.total);
        let idle_delta = after.idle.saturating_sub(before.idle);
        let cpu_percent_used = if total_delta == 0 {
            0.0
        } else {
            100.0 * (1.0 - idle_delta as f64 / total_delta as f64)
        };

        let (total_kb, available_kb) = read_meminfo_kb().unwrap_or((0, 0));
        let memory_total_mb = total_kb as f64 / 1024.0;
        let memory_used_mb = (total_kb.saturating_sub(available_kb)) as f64 / 1024.0;

        SystemStats {
            cpu_percent_used,
            memory_total_mb,
            memory_used_mb,
        }
    }
}

#[derive(Default)]
struct CpuTicks {
    total: u64,
    idle: u64,
}

fn read_cpu_ticks() -> Option<CpuTicks> {
    let mut contents = String::new();
    std::fs::File::open("/proc/stat").ok()?.read_to_string(&mut contents).ok()?;
    let line = contents.lines().next()?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|s| s.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    let total: u64 = fields.iter().sum();
    Some(CpuTicks { total, idle })
}

fn read_meminfo_kb() -> Option<(u64, u64)> {
    let mut contents = String::new();
    std::fs::File::open("/proc/meminfo").ok()?.read_to_string(&mut contents).ok()?;
    let mut total = None;
    let mut available = None;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total = parse_kb(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available = parse_kb(rest);
        }
    }
    Some((total?, available?))
}

fn parse_kb(s: &str) -> Option<u64> {
    s.trim().split_whitespace().next()?.parse().ok()
}

/// Fixed-reading sampler for tests, mirroring the teacher's fake adapters.
pub struct FakeSystemStatsSampler(pub SystemStats);

impl SystemStatsSampler for FakeSystemStatsSampler {
    fn sample(&self) -> SystemStats {
        self.0
    }
}
