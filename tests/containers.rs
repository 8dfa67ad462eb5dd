//! End-to-end container tests over synthetic archive files.

mod common;

use std::io::Write;

use uoarc::def::DefReader;
use uoarc::io::{Compression, Entry, MulContainer, UopArchive, SENTINEL};

fn write_mul_pair(
    payloads: &[&[u8]],
    absent: &[usize],
) -> (tempfile::NamedTempFile, tempfile::NamedTempFile) {
    let mut data = tempfile::NamedTempFile::new().unwrap();
    let mut idx = tempfile::NamedTempFile::new().unwrap();

    let mut offset = 0u32;
    for (i, payload) in payloads.iter().enumerate() {
        if absent.contains(&i) {
            idx.write_all(&SENTINEL.to_le_bytes()).unwrap();
            idx.write_all(&SENTINEL.to_le_bytes()).unwrap();
            idx.write_all(&0u32.to_le_bytes()).unwrap();
            continue;
        }

        data.write_all(payload).unwrap();
        idx.write_all(&offset.to_le_bytes()).unwrap();
        idx.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
        idx.write_all(&0u32.to_le_bytes()).unwrap();
        offset += payload.len() as u32;
    }

    data.flush().unwrap();
    idx.flush().unwrap();
    (data, idx)
}

#[test]
fn def_remap_aliases_to_backing_entry() {
    // Three entries; entry 2 is absent and gets remapped onto entry 0.
    let (data, idx) = write_mul_pair(&[b"first!", b"second", b""], &[2]);
    let mut container = MulContainer::open(data.path(), idx.path(), 0).unwrap();

    let original = container.entry(0);
    assert!(!original.is_absent());
    assert!(container.entry(2).is_absent());

    let def = DefReader::parse("2 {0} 0\n", 2);
    for line in def {
        let index = line.int(0).unwrap() as usize;
        let group = line.group(1).unwrap();
        if !container.entry(index).is_absent() {
            continue;
        }
        for &alt in group {
            if container.arena_mut().alias(index, alt as usize, None) {
                break;
            }
        }
    }

    // The remapped entry reports entry 0's exact offset and length.
    let remapped = container.entry(2);
    assert_eq!(remapped.offset, original.offset);
    assert_eq!(remapped.length, original.length);
    assert_eq!(container.entry_slice(2).unwrap(), b"first!");
}

#[test]
fn uop_zlib_entry_round_trips() {
    let payload: Vec<u8> = b"a moderately repetitive payload "
        .iter()
        .cycle()
        .take(1024)
        .copied()
        .collect();
    let packed = common::deflate(&payload);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artLegacyMUL.uop");
    common::write_uop(
        &path,
        &[
            (
                "build/artlegacymul/00000005.tga".into(),
                packed,
                1,
                payload.len() as u32,
            ),
            (
                "build/artlegacymul/00000009.tga".into(),
                b"raw".to_vec(),
                0,
                3,
            ),
        ],
    );

    let archive = UopArchive::open(&path, false).unwrap();
    assert_eq!(archive.total_entries(), 2);

    let entry = *archive
        .resolve_path("build/artlegacymul/00000005.tga")
        .unwrap();
    assert_eq!(entry.compression, Compression::Zlib);

    let raw = archive.entry_slice(&entry).unwrap();
    let decoded =
        uoarc::io::decompress(entry.compression, raw, entry.decompressed_length as usize)
            .unwrap();
    assert_eq!(decoded, payload);

    // Case-insensitive addressing: same hash for any casing of the path.
    assert!(archive
        .resolve_path("BUILD/ArtLegacyMUL/00000009.TGA")
        .is_some());
    assert!(archive
        .resolve_path("build/artlegacymul/00000010.tga")
        .is_none());
}

#[test]
fn uop_fill_entries_matches_id_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gumpartLegacyMUL.uop");
    common::write_uop(
        &path,
        &[
            (
                "build/gumpartlegacymul/00000001.tga".into(),
                b"one".to_vec(),
                0,
                3,
            ),
            (
                "build/gumpartlegacymul/00000003.tga".into(),
                b"three".to_vec(),
                0,
                5,
            ),
        ],
    );

    let archive = UopArchive::open(&path, false).unwrap();
    let mut entries = vec![Entry::ABSENT; 5];
    archive.fill_entries(&mut entries, |i| {
        format!("build/gumpartlegacymul/{i:08}.tga")
    });

    assert!(entries[0].is_absent());
    assert_eq!(archive.entry_slice(&entries[1]).unwrap(), b"one");
    assert!(entries[2].is_absent());
    assert_eq!(archive.entry_slice(&entries[3]).unwrap(), b"three");
    assert!(entries[4].is_absent());
}
