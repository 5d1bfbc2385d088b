// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Format-aware mutation: parses a seed into named fields per a sidecar
//! format specification, mutates a small random subset of them with
//! type-specific strategies, and recomputes any checksum/length-controller
//! fields afterward.
//!
//! Field type tags are matched structurally against [`FieldType`] rather
//! than parsed out of the tag string's last two characters, which is what
//! breaks on a tag like `uint8` in the format the source used.

use md5::{Digest, Md5};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    U8,
    U16,
    U32,
    U64,
    Crc32,
    Md5,
    IpChecksum,
    OnesComplement16,
    Bytes,
}

impl FieldType {
    pub fn is_checksum(self) -> bool {
        matches!(self, FieldType::Crc32 | FieldType::Md5 | FieldType::IpChecksum | FieldType::OnesComplement16)
    }

    pub fn fixed_width(self) -> Option<usize> {
        match self {
            FieldType::U8 => Some(1),
            FieldType::U16 | FieldType::OnesComplement16 => Some(2),
            FieldType::U32 | FieldType::Crc32 | FieldType::IpChecksum => Some(4),
            FieldType::U64 => Some(8),
            FieldType::Md5 => Some(16),
            FieldType::Bytes => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ftype: FieldType,
    pub offset: usize,
    pub length: usize,
    /// Names of fields this checksum field is computed over, when
    /// `ftype.is_checksum()`.
    #[serde(default)]
    pub covers: Vec<String>,
    /// The name of a field whose byte length this field tracks, when this
    /// field is a length controller.
    #[serde(default)]
    pub controls_length_of: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatSpec {
    pub fields: Vec<FieldSpec>,
}

fn field_bytes<'a>(data: &'a [u8], field: &FieldSpec) -> &'a [u8] {
    let end = (field.offset + field.length).min(data.len());
    if field.offset >= data.len() {
        &[]
    } else {
        &data[field.offset..end]
    }
}

fn mutate_field_bytes(bytes: &mut [u8], field: &FieldSpec, rng: &mut impl Rng) {
    if bytes.is_empty() {
        return;
    }
    match field.ftype {
        FieldType::Bytes => {
            let i = rng.random_range(0..bytes.len());
            bytes[i] = rng.random();
        }
        _ => {
            for b in bytes.iter_mut() {
                *b = rng.random();
            }
        }
    }
}

fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB88320;
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

fn ones_complement_16(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut iter = data.chunks(2);
    for chunk in &mut iter {
        let word = if chunk.len() == 2 { u16::from_be_bytes([chunk[0], chunk[1]]) } else { (chunk[0] as u16) << 8 };
        sum += word as u32;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

fn recompute_checksum(data: &mut Vec<u8>, spec: &FormatSpec, checksum_field: &FieldSpec) {
    let covered: Vec<u8> = checksum_field
        .covers
        .iter()
        .filter_map(|name| spec.fields.iter().find(|f| &f.name == name))
        .flat_map(|f| field_bytes(data, f).to_vec())
        .collect();

    let encoded: Vec<u8> = match checksum_field.ftype {
        FieldType::Crc32 | FieldType::IpChecksum => crc32(&covered).to_le_bytes().to_vec(),
        FieldType::OnesComplement16 => ones_complement_16(&covered).to_le_bytes().to_vec(),
        FieldType::Md5 => {
            let mut hasher = Md5::new();
            hasher.update(&covered);
            hasher.finalize().to_vec()
        }
        _ => return,
    };

    let start = checksum_field.offset;
    let end = (start + checksum_field.length).min(data.len());
    if start < data.len() {
        let take = encoded.len().min(end - start);
        data[start..start + take].copy_from_slice(&encoded[..take]);
    }
}

fn update_length_controller(data: &mut Vec<u8>, spec: &FormatSpec, controller: &FieldSpec) {
    let Some(target_name) = &controller.controls_length_of else { return };
    let Some(target) = spec.fields.iter().find(|f| &f.name == target_name) else { return };
    let new_len = target.length as u64;
    let start = controller.offset;
    let end = (start + controller.length).min(data.len());
    if start >= data.len() {
        return;
    }
    let width = end - start;
    let bytes = new_len.to_le_bytes();
    data[start..end].copy_from_slice(&bytes[..width]);
}

/// Mutates a random subset of 1-3 fields, then recomputes any checksum and
/// length-controller fields so the result stays structurally valid.
pub fn mutate_format_aware(data: &[u8], spec: &FormatSpec, rng: &mut impl Rng) -> Vec<u8> {
    let mut out = data.to_vec();
    let mutable_fields: Vec<&FieldSpec> = spec.fields.iter().filter(|f| !f.ftype.is_checksum() && f.controls_length_of.is_none()).collect();
    if mutable_fields.is_empty() {
        return out;
    }
    let count = rng.random_range(1..=3.min(mutable_fields.len()));
    let mut chosen_indices: Vec<usize> = (0..mutable_fields.len()).collect();
    for _ in 0..count {
        if chosen_indices.is_empty() {
            break;
        }
        let idx = rng.random_range(0..chosen_indices.len());
        let field_idx = chosen_indices.remove(idx);
        let field = mutable_fields[field_idx];
        let start = field.offset.min(out.len());
        let end = (field.offset + field.length).min(out.len());
        mutate_field_bytes(&mut out[start..end], field, rng);
    }

    for field in &spec.fields {
        if field.ftype.is_checksum() {
            recompute_checksum(&mut out, spec, field);
        }
        if field.controls_length_of.is_some() {
            update_length_controller(&mut out, spec, field);
        }
    }
    out
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
