//! Multi (composite building) entries.
//!
//! Multis are kept as a plain entry table: the core resolves where each
//! multi's block list lives and hands the bytes up; interpreting the item
//! records is the collaborator's business. The table is a verdata patch
//! target (subsystem 14).

use tracing::debug;

use crate::io::{MulContainer, UopArchive};
use crate::resolve::FileResolver;
use crate::table::ResourceTable;
use crate::util::Result;

/// Highest addressable multi id.
pub const MAX_MULTI_ID: usize = 0x2200;

/// The multi resource category.
pub struct MultiLoader {
    table: ResourceTable,
}

impl MultiLoader {
    /// Open whichever multi container the data directory ships.
    pub fn load(resolver: &FileResolver, prefer_uop: bool) -> Result<Self> {
        let table = if prefer_uop {
            match resolver.resolve_existing("MultiCollection.uop") {
                Some(path) => {
                    let archive = UopArchive::open(path, false)?;
                    ResourceTable::from_uop(archive, MAX_MULTI_ID, |id| {
                        format!("build/multicollection/{id:06}.bin")
                    })
                }
                None => Self::open_mul(resolver)?,
            }
        } else {
            Self::open_mul(resolver)?
        };

        debug!(entries = table.entry_count(), "multis loaded");

        Ok(Self { table })
    }

    fn open_mul(resolver: &FileResolver) -> Result<ResourceTable> {
        let container = MulContainer::open(
            resolver.resolve("multi.mul"),
            resolver.resolve("multi.idx"),
            MAX_MULTI_ID,
        )?;
        Ok(ResourceTable::from_mul(container))
    }

    /// Build a loader over an already-assembled table (tests).
    pub fn from_table(table: ResourceTable) -> Self {
        Self { table }
    }

    #[inline]
    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    #[inline]
    pub fn table_mut(&mut self) -> &mut ResourceTable {
        &mut self.table
    }

    /// Number of addressable multis.
    #[inline]
    pub fn count(&self) -> usize {
        self.table.entry_count()
    }

    /// Raw block-list bytes for one multi, absent-tolerant.
    pub fn multi_bytes(&self, id: usize) -> Option<Vec<u8>> {
        self.table.bytes(id).map(|b| b.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{ByteSource, Entry};

    #[test]
    fn bytes_round_trip() {
        let entries = vec![
            Entry {
                offset: 0,
                length: 3,
                ..Entry::ABSENT
            },
            Entry::ABSENT,
        ];
        let table = ResourceTable::from_mul(MulContainer::from_parts(
            ByteSource::from_vec(b"abc".to_vec()),
            entries,
        ));
        let multis = MultiLoader::from_table(table);

        assert_eq!(multis.count(), 2);
        assert_eq!(multis.multi_bytes(0).unwrap(), b"abc");
        assert!(multis.multi_bytes(1).is_none());
    }
}
