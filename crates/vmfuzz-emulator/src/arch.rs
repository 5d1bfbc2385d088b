// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Architecture profiles: the mapping from an `arch` config string to the
//! emulator binary, debug-stub tag, word size, endianness and register set
//! used when formatting a debugger script and parsing `info registers`.

use crate::error::EmulatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy)]
pub struct ArchProfile {
    pub name: &'static str,
    pub emulator_binary: &'static str,
    pub debug_stub_tag: &'static str,
    pub word_size_bits: u8,
    pub endianness: Endianness,
    pub instruction_pointer_register: &'static str,
}

const PROFILES: &[ArchProfile] = &[
    ArchProfile {
        name: "x86_64",
        emulator_binary: "qemu-system-x86_64",
        debug_stub_tag: "i386:x86-64",
        word_size_bits: 64,
        endianness: Endianness::Little,
        instruction_pointer_register: "rip",
    },
    ArchProfile {
        name: "i386",
        emulator_binary: "qemu-system-i386",
        debug_stub_tag: "i386",
        word_size_bits: 32,
        endianness: Endianness::Little,
        instruction_pointer_register: "eip",
    },
    ArchProfile {
        name: "aarch64",
        emulator_binary: "qemu-system-aarch64",
        debug_stub_tag: "aarch64",
        word_size_bits: 64,
        endianness: Endianness::Little,
        instruction_pointer_register: "pc",
    },
    ArchProfile {
        name: "arm",
        emulator_binary: "qemu-system-arm",
        debug_stub_tag: "arm",
        word_size_bits: 32,
        endianness: Endianness::Little,
        instruction_pointer_register: "pc",
    },
    ArchProfile {
        name: "mips",
        emulator_binary: "qemu-system-mips",
        debug_stub_tag: "mips",
        word_size_bits: 32,
        endianness: Endianness::Big,
        instruction_pointer_register: "pc",
    },
];

pub fn lookup(arch: &str) -> Result<ArchProfile, EmulatorError> {
    PROFILES
        .iter()
        .find(|p| p.name == arch)
        .copied()
        .ok_or_else(|| EmulatorError::UnknownArch(arch.to_string()))
}

#[cfg(test)]
#[path = "arch_tests.rs"]
mod tests;
