// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-local configuration document, `<state-dir>/config.json`.
//!
//! Every documented key (§6) gets a typed field; anything the document
//! carries beyond those keys is preserved in `extra` rather than discarded,
//! so a newer vmfuzzctl reading an older operator's config round-trips it
//! unchanged on save.

use crate::error::ConfigError;
use crate::lockfile::{write_atomic, FileLock};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    60
}

fn default_controller_port() -> u16 {
    9999
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub max_parallel_vms: u32,
    #[serde(default = "default_arch")]
    pub arch: String,
    #[serde(default)]
    pub disk_image: Option<PathBuf>,
    #[serde(default)]
    pub snapshot_name: Option<String>,
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_crash_dir")]
    pub crash_dir: PathBuf,
    #[serde(default = "default_fuzzer")]
    pub fuzzer: String,
    #[serde(default)]
    pub fuzzer_config: Option<PathBuf>,
    #[serde(default)]
    pub use_vfs: bool,
    #[serde(default = "default_true")]
    pub use_smb: bool,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub enable_vm_screenshots: bool,
    #[serde(default)]
    pub enable_time_compression: bool,
    #[serde(default)]
    pub auth_enabled: bool,
    #[serde(default)]
    pub tls_enabled: bool,
    #[serde(default = "default_controller_host")]
    pub controller_host: String,
    #[serde(default = "default_controller_port")]
    pub controller_port: u16,

    /// Unknown keys, preserved verbatim across load/save.
    #[serde(flatten)]
    pub extra: Map<String, serde_json::Value>,
}

fn default_arch() -> String {
    "x86_64".to_string()
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("corpus")
}

fn default_crash_dir() -> PathBuf {
    PathBuf::from("crashes")
}

fn default_fuzzer() -> String {
    "generic".to_string()
}

fn default_controller_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_parallel_vms: 0,
            arch: default_arch(),
            disk_image: None,
            snapshot_name: None,
            input_dir: default_input_dir(),
            crash_dir: default_crash_dir(),
            fuzzer: default_fuzzer(),
            fuzzer_config: None,
            use_vfs: false,
            use_smb: true,
            timeout: default_timeout(),
            enable_vm_screenshots: false,
            enable_time_compression: false,
            auth_enabled: false,
            tls_enabled: false,
            controller_host: default_controller_host(),
            controller_port: default_controller_port(),
            extra: Map::new(),
        }
    }
}

impl Config {
    /// Returns the default state directory, `~/.vmfuzz`.
    pub fn default_state_dir() -> Result<PathBuf, ConfigError> {
        dirs_home().map(|h| h.join(".vmfuzz")).ok_or(ConfigError::NoStateDir)
    }

    fn config_path(state_dir: &Path) -> PathBuf {
        state_dir.join("config.json")
    }

    /// Load the config from `state_dir`, creating the directory and a
    /// default config file on first run.
    pub fn load(state_dir: &Path) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(state_dir).map_err(|e| ConfigError::Io {
            path: state_dir.to_path_buf(),
            source: e,
        })?;
        let path = Self::config_path(state_dir);
        if !path.exists() {
            let cfg = Self::default();
            cfg.save(state_dir)?;
            return Ok(cfg);
        }
        let bytes = std::fs::read(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ConfigError::Parse { path, source: e })
    }

    /// Persist the config under an exclusive advisory lock on
    /// `config.json.lock`, writing atomically via a temp file + rename.
    pub fn save(&self, state_dir: &Path) -> Result<(), ConfigError> {
        let path = Self::config_path(state_dir);
        let lock_path = path.with_extension("json.lock");
        let _guard = FileLock::acquire_exclusive(&lock_path)
            .map_err(|(p, e)| ConfigError::LockFailed(p, e))?;
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        write_atomic(&path, &bytes).map_err(|e| ConfigError::Io { path, source: e })
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
