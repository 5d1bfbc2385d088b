// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The VM registry: `<state-dir>/registry.json`, a mixed-key JSON document
//! where integer-convertible keys are VM ids and the `last_vm_id` key holds
//! the monotonic id counter. A writer takes `registry.json.lock`; a reader
//! may skip the lock but must tolerate observing a half-written file from a
//! concurrent writer, so read failures are retried once after a short delay.

use crate::error::ConfigError;
use crate::lockfile::{write_atomic, FileLock};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vmfuzz_core::{VmId, VmRecord};

const LAST_VM_ID_KEY: &str = "last_vm_id";

pub struct Registry {
    path: PathBuf,
    lock_path: PathBuf,
}

impl Registry {
    pub fn new(state_dir: &Path) -> Self {
        let path = state_dir.join("registry.json");
        let lock_path = path.with_extension("json.lock");
        Self { path, lock_path }
    }

    fn read_raw(&self) -> Result<Map<String, Value>, ConfigError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let attempt = |path: &Path| -> Result<Map<String, Value>, ConfigError> {
            let bytes = std::fs::read(path).map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            if bytes.is_empty() {
                return Ok(Map::new());
            }
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) | Err(_) => Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: serde_json::from_str::<Value>("{").unwrap_err(),
                }),
            }
        };

        match attempt(&self.path) {
            Ok(map) => Ok(map),
            Err(_) => {
                std::thread::sleep(Duration::from_millis(20));
                attempt(&self.path)
            }
        }
    }

    fn write_raw(&self, map: &Map<String, Value>) -> Result<(), ConfigError> {
        let bytes = serde_json::to_vec_pretty(map).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            source: e,
        })?;
        write_atomic(&self.path, &bytes).map_err(|e| ConfigError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    fn last_vm_id(map: &Map<String, Value>) -> i64 {
        map.get(LAST_VM_ID_KEY).and_then(Value::as_i64).unwrap_or(0)
    }

    /// Insert `record` under a freshly allocated id, persisting the new
    /// `last_vm_id`. Returns the allocated id.
    pub fn add_vm(&self, mut record: VmRecord) -> Result<VmId, ConfigError> {
        let _guard =
            FileLock::acquire_exclusive(&self.lock_path).map_err(|(p, e)| ConfigError::LockFailed(p, e))?;
        let mut map = self.read_raw()?;
        let next_id = Self::last_vm_id(&map) + 1;
        record.id = VmId::new(next_id);
        let record_value = serde_json::to_value(&record).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            source: e,
        })?;
        map.insert(next_id.to_string(), record_value);
        map.insert(LAST_VM_ID_KEY.to_string(), Value::from(next_id));
        self.write_raw(&map)?;
        Ok(VmId::new(next_id))
    }

    /// No-op if `id` is not present.
    pub fn remove_vm(&self, id: VmId) -> Result<(), ConfigError> {
        let _guard =
            FileLock::acquire_exclusive(&self.lock_path).map_err(|(p, e)| ConfigError::LockFailed(p, e))?;
        let mut map = self.read_raw()?;
        if map.remove(&id.get().to_string()).is_some() {
            self.write_raw(&map)?;
        }
        Ok(())
    }

    pub fn get(&self, id: VmId) -> Result<Option<VmRecord>, ConfigError> {
        let map = self.read_raw()?;
        match map.get(&id.get().to_string()) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ConfigError::Parse {
                    path: self.path.clone(),
                    source: e,
                }),
            None => Ok(None),
        }
    }

    /// Update an existing record in place; fails silently (no-op) if the id
    /// is absent, matching `remove_vm`'s tolerance of stale ids.
    pub fn update_vm(&self, record: &VmRecord) -> Result<(), ConfigError> {
        let _guard =
            FileLock::acquire_exclusive(&self.lock_path).map_err(|(p, e)| ConfigError::LockFailed(p, e))?;
        let mut map = self.read_raw()?;
        let key = record.id.get().to_string();
        if map.contains_key(&key) {
            let value = serde_json::to_value(record).map_err(|e| ConfigError::Parse {
                path: self.path.clone(),
                source: e,
            })?;
            map.insert(key, value);
            self.write_raw(&map)?;
        }
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<VmRecord>, ConfigError> {
        let map = self.read_raw()?;
        let mut records = Vec::new();
        for (key, value) in &map {
            if key == LAST_VM_ID_KEY {
                continue;
            }
            let record: VmRecord = serde_json::from_value(value.clone()).map_err(|e| ConfigError::Parse {
                path: self.path.clone(),
                source: e,
            })?;
            records.push(record);
        }
        records.sort_by_key(|r| r.id.get());
        Ok(records)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
