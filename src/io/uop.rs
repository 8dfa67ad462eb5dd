//! Hash-addressed UOP archives.
//!
//! The later container era packs a whole category into one archive addressed
//! by 64-bit hashes of virtual paths. The layout is a fixed header followed
//! by a chain of blocks; each block declares how many entry records it holds
//! and where the next block starts.
//!
//! ```text
//! +--------------------------------------+
//! | Magic "MYP\0"              u32       |
//! | Version                    u32       |
//! | Format timestamp           u32       |
//! | First block offset         i64       |
//! | Block capacity             u32       |
//! | Total entry count          i32       |
//! +--------------------------------------+
//! | Block: count i32, next i64           |
//! |   entry * count:                     |
//! |     offset i64, header_len i32,      |
//! |     compressed_len i32,              |
//! |     decompressed_len i32,            |
//! |     hash u64, data_hash u32,         |
//! |     flag i16                         |
//! +--------------------------------------+
//! ```
//!
//! The hash table is built once while walking the chain and is read-only
//! afterwards; concurrent lookups need no synchronization.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::io::entry::{Compression, Entry};
use crate::io::ByteSource;
use crate::util::{Error, Result};

/// `MYP\0` little-endian.
pub const UOP_MAGIC: u32 = 0x0050_594D;

const BLOCK_HEADER_SIZE: u64 = 12;
const ENTRY_RECORD_SIZE: u64 = 34;

/// A UOP archive with its hash index.
pub struct UopArchive {
    data: ByteSource,
    hashes: HashMap<u64, Entry>,
    total_entries: usize,
}

impl UopArchive {
    /// Open an archive and walk its block chain.
    ///
    /// `has_extra` marks archives whose payloads begin with two 32-bit extra
    /// fields (gump dimensions); those are folded into each entry's `extra`
    /// word and the payload window shrinks past them.
    pub fn open(path: impl AsRef<Path>, has_extra: bool) -> Result<Self> {
        let data = ByteSource::open(&path)?;

        if data.read_u32(0)? != UOP_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let _version = data.read_u32(4)?;
        let _format_timestamp = data.read_u32(8)?;
        let mut next_block = data.read_u64(12)? as i64;
        let _block_capacity = data.read_u32(20)?;
        let _declared_count = data.read_i32(24)?;

        let mut hashes = HashMap::new();
        let mut total_entries = 0usize;

        while next_block != 0 {
            let block_at = next_block as u64;
            let count = data.read_i32(block_at)?.max(0) as u64;
            next_block = data.read_u64(block_at + 4)? as i64;

            for i in 0..count {
                let at = block_at + BLOCK_HEADER_SIZE + i * ENTRY_RECORD_SIZE;

                let offset = data.read_u64(at)? as i64;
                let header_len = data.read_i32(at + 8)?;
                let compressed_len = data.read_i32(at + 12)?;
                let decompressed_len = data.read_i32(at + 16)?;
                let hash = data.read_u64(at + 20)?;
                let _data_hash = data.read_u32(at + 28)?;
                let flag = data.read_u16(at + 32)?;

                if offset == 0 {
                    continue;
                }

                let compression = match Compression::from_flag(flag) {
                    Ok(c) => c,
                    Err(_) => {
                        warn!(hash, flag, "skipping entry with unknown compression flag");
                        continue;
                    }
                };

                let payload_at = offset as u64 + header_len as u64;

                let entry = if has_extra {
                    let extra1 = data.read_i32(payload_at)? as i16 as u16 as u32;
                    let extra2 = data.read_i32(payload_at + 4)? as i16 as u16 as u32;

                    Entry {
                        offset: payload_at + 8,
                        length: (compressed_len - 8).max(0) as u32,
                        decompressed_length: decompressed_len.max(0) as u32,
                        compression,
                        extra: (extra1 << 16) | extra2,
                        ..Entry::ABSENT
                    }
                } else {
                    Entry {
                        offset: payload_at,
                        length: compressed_len.max(0) as u32,
                        decompressed_length: decompressed_len.max(0) as u32,
                        compression,
                        ..Entry::ABSENT
                    }
                };

                total_entries += 1;
                hashes.insert(hash, entry);
            }
        }

        debug!(
            path = %path.as_ref().display(),
            entries = total_entries,
            "opened uop archive"
        );

        Ok(Self {
            data,
            hashes,
            total_entries,
        })
    }

    /// The backing archive file.
    #[inline]
    pub fn data(&self) -> &ByteSource {
        &self.data
    }

    /// Number of live entries found while walking the chain.
    #[inline]
    pub fn total_entries(&self) -> usize {
        self.total_entries
    }

    /// Resolve an entry by virtual-path hash.
    #[inline]
    pub fn resolve(&self, hash: u64) -> Option<&Entry> {
        self.hashes.get(&hash)
    }

    /// Resolve an entry by virtual path.
    #[inline]
    pub fn resolve_path(&self, path: &str) -> Option<&Entry> {
        self.resolve(uop_hash::hash_path(path))
    }

    /// Materialize an id-indexed view: for each slot, format the virtual
    /// path for that id and copy the matching entry if the archive has one.
    pub fn fill_entries(&self, entries: &mut [Entry], path_for: impl Fn(usize) -> String) {
        for (id, slot) in entries.iter_mut().enumerate() {
            if let Some(entry) = self.resolve_path(&path_for(id)) {
                *slot = *entry;
            }
        }
    }

    /// Borrow the stored (still compressed) payload bytes of an entry.
    pub fn entry_slice(&self, entry: &Entry) -> Option<&[u8]> {
        if entry.is_absent() {
            return None;
        }
        self.data.slice(entry.offset, entry.length as usize).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal single-block archive writer shared by the uop tests.
    fn write_archive(
        entries: &[(String, Vec<u8>, u16, u32)], // (path, stored bytes, flag, dec_len)
        extra: Option<(i32, i32)>,
    ) -> tempfile::NamedTempFile {
        let mut payloads = Vec::new();
        let header_size = 28u64;
        let block_at = header_size;
        let records_end =
            block_at + BLOCK_HEADER_SIZE + entries.len() as u64 * ENTRY_RECORD_SIZE;

        let mut body = Vec::new();
        let mut cursor = records_end;
        for (path, bytes, flag, dec_len) in entries {
            let mut stored = Vec::new();
            if let Some((e1, e2)) = extra {
                stored.extend_from_slice(&e1.to_le_bytes());
                stored.extend_from_slice(&e2.to_le_bytes());
            }
            stored.extend_from_slice(bytes);
            payloads.push((
                uop_hash::hash_path(path),
                cursor,
                stored.len() as i32,
                *flag,
                *dec_len,
            ));
            cursor += stored.len() as u64;
            body.extend_from_slice(&stored);
        }

        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&UOP_MAGIC.to_le_bytes()).unwrap();
        f.write_all(&5u32.to_le_bytes()).unwrap(); // version
        f.write_all(&0u32.to_le_bytes()).unwrap(); // timestamp
        f.write_all(&block_at.to_le_bytes()).unwrap();
        f.write_all(&100u32.to_le_bytes()).unwrap(); // block capacity
        f.write_all(&(entries.len() as i32).to_le_bytes()).unwrap();

        f.write_all(&(entries.len() as i32).to_le_bytes()).unwrap();
        f.write_all(&0u64.to_le_bytes()).unwrap(); // no next block

        for (hash, offset, len, flag, dec_len) in &payloads {
            f.write_all(&offset.to_le_bytes()).unwrap();
            f.write_all(&0i32.to_le_bytes()).unwrap(); // header_len
            f.write_all(&len.to_le_bytes()).unwrap();
            f.write_all(&(*dec_len as i32).to_le_bytes()).unwrap();
            f.write_all(&hash.to_le_bytes()).unwrap();
            f.write_all(&0u32.to_le_bytes()).unwrap(); // data hash
            f.write_all(&flag.to_le_bytes()).unwrap();
        }

        f.write_all(&body).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn resolves_by_path() {
        let file = write_archive(
            &[
                (
                    "build/artlegacymul/00000000.tga".into(),
                    b"first".to_vec(),
                    0,
                    5,
                ),
                (
                    "build/artlegacymul/00000002.tga".into(),
                    b"third".to_vec(),
                    0,
                    5,
                ),
            ],
            None,
        );

        let arc = UopArchive::open(file.path(), false).unwrap();
        assert_eq!(arc.total_entries(), 2);

        let entry = arc.resolve_path("build/artlegacymul/00000000.tga").unwrap();
        assert_eq!(arc.entry_slice(entry).unwrap(), b"first");

        assert!(arc.resolve_path("build/artlegacymul/00000001.tga").is_none());
    }

    #[test]
    fn fill_entries_leaves_gaps_absent() {
        let file = write_archive(
            &[(
                "build/artlegacymul/00000002.tga".into(),
                b"third".to_vec(),
                0,
                5,
            )],
            None,
        );

        let arc = UopArchive::open(file.path(), false).unwrap();
        let mut entries = vec![Entry::ABSENT; 4];
        arc.fill_entries(&mut entries, |i| format!("build/artlegacymul/{i:08}.tga"));

        assert!(entries[0].is_absent());
        assert!(entries[1].is_absent());
        assert!(!entries[2].is_absent());
        assert!(entries[3].is_absent());
    }

    #[test]
    fn extra_fields_shift_payload() {
        let file = write_archive(
            &[(
                "build/gumpartlegacymul/00000007.tga".into(),
                b"pixels".to_vec(),
                0,
                6,
            )],
            Some((30, 40)),
        );

        let arc = UopArchive::open(file.path(), true).unwrap();
        let entry = arc
            .resolve_path("build/gumpartlegacymul/00000007.tga")
            .copied()
            .unwrap();

        assert_eq!(entry.extra_hi(), 30);
        assert_eq!(entry.extra_lo(), 40);
        assert_eq!(arc.entry_slice(&entry).unwrap(), b"pixels");
    }

    #[test]
    fn bad_magic_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"NOPE").unwrap();
        f.write_all(&[0u8; 64]).unwrap();
        f.flush().unwrap();

        assert!(matches!(
            UopArchive::open(f.path(), false),
            Err(Error::InvalidMagic)
        ));
    }
}
