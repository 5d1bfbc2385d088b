// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Free-port selection via the "bind to port 0, read the assigned port,
//! close the socket" trick. There is an inherent TOCTOU race between
//! closing the probe socket and the emulator binding it, but it is the
//! same race the source accepts and is not worth a more elaborate scheme
//! for a local-only control-plane port.

use crate::error::EmulatorError;
use std::net::TcpListener;

pub fn pick_free_port() -> Result<u16, EmulatorError> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).map_err(EmulatorError::NoFreePort)?;
    let port = listener.local_addr().map_err(EmulatorError::NoFreePort)?.port();
    drop(listener);
    Ok(port)
}

pub fn pick_n_free_ports(n: usize) -> Result<Vec<u16>, EmulatorError> {
    (0..n).map(|_| pick_free_port()).collect()
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
