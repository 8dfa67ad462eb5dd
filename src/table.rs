//! Id-addressed resource tables over either container era.
//!
//! A resource category (art, gumps, multis, sounds) is backed by a MUL
//! data/index pair or by a UOP archive, whichever the data directory ships.
//! [`ResourceTable`] erases that choice behind one id-indexed entry arena:
//! UOP archives are materialized into the arena once at load by formatting
//! each id's virtual path and probing the hash index.
//!
//! The table also owns the entry-to-bytes step: picking the physical source
//! (the container itself, or the verdata blob an entry was redirected into)
//! and running the decompression pipeline. A corrupt payload is logged and
//! reported as absent; it never escalates.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::warn;

use crate::io::{
    compression, ByteSource, Compression, DataSource, Entry, EntryArena, MulContainer, UopArchive,
};

enum Backing {
    Mul(MulContainer),
    Uop(UopArchive),
}

/// An id-addressed entry table with uniform payload access.
pub struct ResourceTable {
    backing: Backing,
    /// For MUL backings the arena lives inside the container; UOP backings
    /// keep the materialized id view here.
    uop_arena: EntryArena,
    verdata: Option<Arc<ByteSource>>,
}

impl ResourceTable {
    /// Wrap an opened MUL container.
    pub fn from_mul(container: MulContainer) -> Self {
        Self {
            backing: Backing::Mul(container),
            uop_arena: EntryArena::default(),
            verdata: None,
        }
    }

    /// Wrap an opened UOP archive, materializing an id-indexed view.
    ///
    /// `capacity` is the id space to probe; `path_for` formats the virtual
    /// path for an id (`build/artlegacymul/00000123.tga`).
    pub fn from_uop(
        archive: UopArchive,
        capacity: usize,
        path_for: impl Fn(usize) -> String,
    ) -> Self {
        let mut entries = vec![Entry::ABSENT; capacity.max(archive.total_entries())];
        archive.fill_entries(&mut entries, path_for);

        Self {
            backing: Backing::Uop(archive),
            uop_arena: EntryArena::new(entries),
            verdata: None,
        }
    }

    /// Attach the verdata blob so redirected entries can be read.
    pub fn attach_verdata(&mut self, verdata: Arc<ByteSource>) {
        self.verdata = Some(verdata);
    }

    /// True when the backing is a UOP archive.
    pub fn is_uop(&self) -> bool {
        matches!(self.backing, Backing::Uop(_))
    }

    /// The entry arena.
    pub fn arena(&self) -> &EntryArena {
        match &self.backing {
            Backing::Mul(c) => c.arena(),
            Backing::Uop(_) => &self.uop_arena,
        }
    }

    /// Mutable entry arena, for overlay passes.
    pub fn arena_mut(&mut self) -> &mut EntryArena {
        match &mut self.backing {
            Backing::Mul(c) => c.arena_mut(),
            Backing::Uop(_) => &mut self.uop_arena,
        }
    }

    /// Number of addressable entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.arena().len()
    }

    /// Look up an entry by id; out-of-range ids are absent.
    #[inline]
    pub fn entry(&self, id: usize) -> Entry {
        self.arena().entry(id)
    }

    /// Redirect an entry's storage into the verdata blob.
    pub fn redirect_to_verdata(&mut self, id: usize, position: u64, length: u32, extra: u32) {
        if id >= self.arena().len() {
            return;
        }
        self.arena_mut().set_entry(
            id,
            Entry {
                offset: position,
                length,
                decompressed_length: 0,
                compression: Compression::None,
                source: DataSource::Verdata,
                extra,
            },
        );
    }

    /// Restore every entry to its pre-patch state.
    pub fn reset_patches(&mut self) {
        self.arena_mut().reset();
    }

    /// Fetch and decompress an entry's payload.
    ///
    /// Absent entries, unreadable ranges and corrupt streams all come back
    /// as `None`; the caller renders "nothing" for that id.
    pub fn bytes(&self, id: usize) -> Option<Cow<'_, [u8]>> {
        let entry = self.entry(id);
        if entry.is_absent() {
            return None;
        }

        let raw = match entry.source {
            DataSource::Verdata => {
                let verdata = self.verdata.as_deref()?;
                verdata.slice(entry.offset, entry.length as usize).ok()?
            }
            DataSource::Container => match &self.backing {
                Backing::Mul(c) => c.data().slice(entry.offset, entry.length as usize).ok()?,
                Backing::Uop(a) => a.data().slice(entry.offset, entry.length as usize).ok()?,
            },
        };

        match entry.compression {
            Compression::None => Some(Cow::Borrowed(raw)),
            flag => match compression::decompress(flag, raw, entry.decompressed_length as usize) {
                Ok(bytes) => Some(Cow::Owned(bytes)),
                Err(e) => {
                    warn!(id, error = %e, "entry payload failed to decompress; treating as absent");
                    None
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Entry;

    fn mul_table() -> ResourceTable {
        let data = ByteSource::from_vec(b"aaaabbbbcccc".to_vec());
        let entries = vec![
            Entry {
                offset: 0,
                length: 4,
                ..Entry::ABSENT
            },
            Entry {
                offset: 4,
                length: 4,
                ..Entry::ABSENT
            },
            Entry::ABSENT,
        ];
        ResourceTable::from_mul(MulContainer::from_parts(data, entries))
    }

    #[test]
    fn bytes_for_plain_entries() {
        let table = mul_table();
        assert_eq!(table.bytes(0).unwrap().as_ref(), b"aaaa");
        assert_eq!(table.bytes(1).unwrap().as_ref(), b"bbbb");
        assert!(table.bytes(2).is_none());
        assert!(table.bytes(99).is_none());
    }

    #[test]
    fn verdata_redirect_and_reset() {
        let mut table = mul_table();
        let verdata = Arc::new(ByteSource::from_vec(b"PATCHDATA".to_vec()));
        table.attach_verdata(verdata);

        table.redirect_to_verdata(1, 5, 4, 0);
        assert_eq!(table.bytes(1).unwrap().as_ref(), b"DATA");

        table.reset_patches();
        assert_eq!(table.bytes(1).unwrap().as_ref(), b"bbbb");
    }

    #[test]
    fn redirect_without_blob_is_absent() {
        let mut table = mul_table();
        table.redirect_to_verdata(0, 0, 4, 0);
        assert!(table.bytes(0).is_none());
    }
}
