// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the batch-mode debugger script written to a temp file and
//! passed to the host debugger's `-x` flag.

use crate::error::DebugStubError;
use std::path::PathBuf;
use vmfuzz_emulator::ArchProfile;

pub fn render_script(profile: &ArchProfile, port: u16) -> String {
    format!(
        "set architecture {arch}\n\
         set pagination off\n\
         set confirm off\n\
         target remote 127.0.0.1:{port}\n\
         info registers\n\
         continue\n",
        arch = profile.debug_stub_tag,
    )
}

/// Writes the rendered script to a fresh temp file and returns its path.
/// The caller is responsible for deleting it once the debugger exits.
pub fn write_script(profile: &ArchProfile, port: u16) -> Result<PathBuf, DebugStubError> {
    let contents = render_script(profile, port);
    let mut path = std::env::temp_dir();
    path.push(format!("vmfuzz-dbg-{port}-{}.gdb", std::process::id()));
    std::fs::write(&path, contents).map_err(DebugStubError::ScriptWrite)?;
    Ok(path)
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
