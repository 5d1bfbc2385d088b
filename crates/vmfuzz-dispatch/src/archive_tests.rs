// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_job_inputs(root: &Path) -> (PathBuf, PathBuf) {
    let disk_image = root.join("target.qcow2");
    std::fs::write(&disk_image, b"fake qcow2 bytes").unwrap();
    let corpus_dir = root.join("corpus");
    std::fs::create_dir_all(&corpus_dir).unwrap();
    std::fs::write(corpus_dir.join("seed0.bin"), b"AAAA").unwrap();
    (disk_image, corpus_dir)
}

#[test]
fn pack_then_unpack_round_trips_the_disk_image_and_corpus() {
    let src = tempfile::tempdir().unwrap();
    let (disk_image, corpus_dir) = sample_job_inputs(src.path());

    let staging = tempfile::tempdir().unwrap();
    let (archive_path, size) = pack_job_archive(staging.path(), 42, &disk_image, &corpus_dir).unwrap();
    assert!(size > 0);

    let job_dir = tempfile::tempdir().unwrap();
    let (unpacked_disk, unpacked_corpus) = unpack_job_archive(&archive_path, job_dir.path()).unwrap();
    assert_eq!(std::fs::read(&unpacked_disk).unwrap(), b"fake qcow2 bytes");
    assert_eq!(std::fs::read(unpacked_corpus.join("seed0.bin")).unwrap(), b"AAAA");
}

#[test]
fn unpack_skips_a_member_path_that_escapes_the_job_directory() {
    let staging = tempfile::tempdir().unwrap();
    let archive_path = staging.path().join("evil.tar.gz");
    {
        let file = File::create(&archive_path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        let name = b"../../etc/evil";
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(3);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, &b"pwn"[..]).unwrap();

        let mut good_header = tar::Header::new_gnu();
        good_header.set_size(4);
        good_header.set_mode(0o644);
        good_header.set_cksum();
        builder.append_data(&mut good_header, "disk.qcow2", &b"ok!!"[..]).unwrap();

        builder.into_inner().unwrap().finish().unwrap();
    }

    let job_dir = tempfile::tempdir().unwrap();
    let (unpacked_disk, _corpus) = unpack_job_archive(&archive_path, job_dir.path()).unwrap();
    assert_eq!(std::fs::read(&unpacked_disk).unwrap(), b"ok!!");

    let escaped = job_dir.path().parent().unwrap().parent().unwrap().join("etc/evil");
    assert!(!escaped.exists());
}

#[test]
fn escapes_destination_flags_parent_dir_components_and_absolute_paths() {
    assert!(escapes_destination(Path::new("../outside")));
    assert!(escapes_destination(Path::new("/etc/passwd")));
    assert!(!escapes_destination(Path::new("corpus/seed0.bin")));
}
