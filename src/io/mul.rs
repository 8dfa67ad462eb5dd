//! Index-paired MUL containers.
//!
//! The older container era stores a resource category as two files: a data
//! file holding concatenated payloads and an index file of fixed 12-byte
//! records (`offset`, `length`, `extra`), one per logical id in id order.

use std::path::Path;

use tracing::trace;

use crate::io::arena::EntryArena;
use crate::io::entry::{DataSource, Entry, SENTINEL};
use crate::io::{ByteSource, SliceReader};
use crate::util::Result;

/// Size of one index record on disk.
pub const IDX_RECORD_SIZE: usize = 12;

/// A MUL data file with its parallel index.
pub struct MulContainer {
    data: ByteSource,
    arena: EntryArena,
}

impl MulContainer {
    /// Open a data/index pair.
    ///
    /// `capacity` pads the entry table up to a fixed logical size when the
    /// index file is shorter than the id space the category addresses.
    pub fn open(
        data_path: impl AsRef<Path>,
        idx_path: impl AsRef<Path>,
        capacity: usize,
    ) -> Result<Self> {
        let data = ByteSource::open(&data_path)?;
        let idx = ByteSource::open(&idx_path)?;

        let record_count = (idx.len() / IDX_RECORD_SIZE as u64) as usize;
        let idx_bytes = idx.read_bytes(0, record_count * IDX_RECORD_SIZE)?;
        let mut reader = SliceReader::new(&idx_bytes);

        let mut entries = vec![Entry::ABSENT; record_count.max(capacity)];

        for slot in entries.iter_mut().take(record_count) {
            let offset = reader.read_u32()?;
            let length = reader.read_u32()?;
            let extra = reader.read_u32()?;

            if offset == SENTINEL || length == SENTINEL || length == 0 {
                continue;
            }

            *slot = Entry {
                offset: offset as u64,
                length,
                extra,
                ..Entry::ABSENT
            };
        }

        trace!(
            path = %data_path.as_ref().display(),
            records = record_count,
            "opened mul container"
        );

        Ok(Self {
            data,
            arena: EntryArena::new(entries),
        })
    }

    /// Open a bare data file with no index (map files, verdata).
    pub fn open_plain(data_path: impl AsRef<Path>) -> Result<Self> {
        let data = ByteSource::open(data_path)?;
        Ok(Self {
            data,
            arena: EntryArena::default(),
        })
    }

    /// Build a container over in-memory data and entries (tests, synthetic
    /// tables).
    pub fn from_parts(data: ByteSource, entries: Vec<Entry>) -> Self {
        Self {
            data,
            arena: EntryArena::new(entries),
        }
    }

    /// The backing data file.
    #[inline]
    pub fn data(&self) -> &ByteSource {
        &self.data
    }

    /// The entry arena.
    #[inline]
    pub fn arena(&self) -> &EntryArena {
        &self.arena
    }

    /// Mutable entry arena, for overlay passes.
    #[inline]
    pub fn arena_mut(&mut self) -> &mut EntryArena {
        &mut self.arena
    }

    /// Number of addressable entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.arena.len()
    }

    /// Look up an entry by id; out-of-range ids are absent, never an error.
    #[inline]
    pub fn entry(&self, id: usize) -> Entry {
        self.arena.entry(id)
    }

    /// Borrow the payload bytes of an entry stored in this container's data
    /// file. Absent entries and verdata-redirected entries yield `None`.
    pub fn entry_slice(&self, id: usize) -> Option<&[u8]> {
        let entry = self.arena.entry(id);
        if entry.is_absent() || entry.source != DataSource::Container {
            return None;
        }
        self.data.slice(entry.offset, entry.length as usize).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_idx(records: &[(u32, u32, u32)]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for &(off, len, extra) in records {
            f.write_all(&off.to_le_bytes()).unwrap();
            f.write_all(&len.to_le_bytes()).unwrap();
            f.write_all(&extra.to_le_bytes()).unwrap();
        }
        f.flush().unwrap();
        f
    }

    fn write_data(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn parses_index_records() {
        let data = write_data(b"0123456789");
        let idx = write_idx(&[(0, 4, 7), (4, 6, 0), (SENTINEL, SENTINEL, 0)]);

        let c = MulContainer::open(data.path(), idx.path(), 0).unwrap();
        assert_eq!(c.entry_count(), 3);

        let e0 = c.entry(0);
        assert_eq!(e0.offset, 0);
        assert_eq!(e0.length, 4);
        assert_eq!(e0.extra, 7);

        assert!(c.entry(2).is_absent());
        // Out of range never errors.
        assert!(c.entry(999).is_absent());

        assert_eq!(c.entry_slice(1).unwrap(), b"456789");
    }

    #[test]
    fn capacity_pads_with_absent() {
        let data = write_data(b"xy");
        let idx = write_idx(&[(0, 2, 0)]);

        let c = MulContainer::open(data.path(), idx.path(), 8).unwrap();
        assert_eq!(c.entry_count(), 8);
        assert!(c.entry(5).is_absent());
    }

    #[test]
    fn alias_and_reset_through_arena() {
        let data = write_data(b"abcdef");
        let idx = write_idx(&[(0, 3, 0), (3, 3, 0), (SENTINEL, 0, 0)]);

        let mut c = MulContainer::open(data.path(), idx.path(), 0).unwrap();

        assert!(c.arena_mut().alias(2, 0, Some(0x44)));
        let aliased = c.entry(2);
        assert_eq!(aliased.offset, 0);
        assert_eq!(aliased.length, 3);
        assert_eq!(aliased.extra, 0x44);
        assert_eq!(c.entry_slice(2).unwrap(), b"abc");

        c.arena_mut().reset();
        assert!(c.entry(2).is_absent());
    }
}
