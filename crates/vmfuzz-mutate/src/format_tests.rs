// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_spec() -> FormatSpec {
    FormatSpec {
        fields: vec![
            FieldSpec { name: "magic".to_string(), ftype: FieldType::U32, offset: 0, length: 4, covers: vec![], controls_length_of: None },
            FieldSpec { name: "payload".to_string(), ftype: FieldType::Bytes, offset: 4, length: 8, covers: vec![], controls_length_of: None },
            FieldSpec { name: "checksum".to_string(), ftype: FieldType::Crc32, offset: 12, length: 4, covers: vec!["payload".to_string()], controls_length_of: None },
        ],
    }
}

#[test]
fn checksum_field_is_not_among_mutable_fields_directly() {
    let spec = sample_spec();
    let data = vec![0u8; 16];
    let mut rng = rand::rng();
    // Run many times; the checksum bytes should always end up consistent
    // with the (possibly mutated) payload, never left stale.
    for _ in 0..20 {
        let out = mutate_format_aware(&data, &spec, &mut rng);
        let payload = &out[4..12];
        let expected = crc32(payload).to_le_bytes();
        assert_eq!(&out[12..16], &expected[..]);
    }
}

#[test]
fn output_length_is_preserved_for_fixed_width_fields() {
    let spec = sample_spec();
    let data = vec![0u8; 16];
    let mut rng = rand::rng();
    let out = mutate_format_aware(&data, &spec, &mut rng);
    assert_eq!(out.len(), data.len());
}

#[test]
fn u8_type_tag_is_matched_structurally_not_by_byte_slicing() {
    // Regression guard for the `int(ftype[-2:])` bug: `uint8`'s tag
    // structurally resolves to a 1-byte field rather than failing to parse.
    assert_eq!(FieldType::U8.fixed_width(), Some(1));
}

#[test]
fn md5_checksum_field_holds_a_real_digest_not_a_padded_crc32() {
    let spec = FormatSpec {
        fields: vec![
            FieldSpec { name: "payload".to_string(), ftype: FieldType::Bytes, offset: 0, length: 8, covers: vec![], controls_length_of: None },
            FieldSpec { name: "checksum".to_string(), ftype: FieldType::Md5, offset: 8, length: 16, covers: vec!["payload".to_string()], controls_length_of: None },
        ],
    };
    let mut data = vec![0u8; 24];
    recompute_checksum(&mut data, &spec, &spec.fields[1]);

    let mut hasher = Md5::new();
    hasher.update(&data[0..8]);
    let expected = hasher.finalize();
    assert_eq!(&data[8..24], expected.as_slice());

    // A padded CRC32 would be zero past the first 4 bytes; a real MD5
    // digest over all-zero input is not.
    assert_ne!(&data[12..24], &[0u8; 12][..]);
}

#[test]
fn length_controller_tracks_the_field_it_controls() {
    let spec = FormatSpec {
        fields: vec![
            FieldSpec { name: "len".to_string(), ftype: FieldType::U8, offset: 0, length: 1, covers: vec![], controls_length_of: Some("payload".to_string()) },
            FieldSpec { name: "payload".to_string(), ftype: FieldType::Bytes, offset: 1, length: 5, covers: vec![], controls_length_of: None },
        ],
    };
    let data = vec![0u8; 6];
    let mut rng = rand::rng();
    let out = mutate_format_aware(&data, &spec, &mut rng);
    assert_eq!(out[0], 5);
}
