// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Emulator process lifecycle: architecture profiles, port allocation, the
//! monitor protocol, and spawn/stop/revert/screenshot orchestration.

mod arch;
mod error;
mod manager;
mod monitor;
mod ports;

pub use arch::{lookup as lookup_arch, ArchProfile, Endianness};
pub use error::EmulatorError;
pub use manager::{
    revert_to_snapshot, screenshot, start_vm, status_refresh, stop_vm, DisplayMode, ShareTransport,
    SpawnRequest, SpawnedVm,
};
pub use monitor::{fast_revert, fast_revert_over_tcp, screenshot_over_tcp};
pub use ports::{pick_free_port, pick_n_free_ports};
