//! Gump art.
//!
//! Gump sprites carry their dimensions outside the pixel data: the MUL
//! index packs `width << 16 | height` into the record's extra word, and the
//! UOP archive stores the same pair in each payload's leading bytes (the
//! has-extra archive mode). The pixels themselves are per-row run-length
//! pairs.

use tracing::debug;

use crate::io::{MulContainer, UopArchive};
use crate::resolve::FileResolver;
use crate::sprite::{self, DecodedFrame};
use crate::table::ResourceTable;
use crate::util::Result;

/// Highest addressable gump id.
pub const MAX_GUMP_ID: usize = 0x10000;

/// The gump resource category.
pub struct GumpLoader {
    table: ResourceTable,
}

impl GumpLoader {
    /// Open whichever gump container the data directory ships.
    pub fn load(resolver: &FileResolver, prefer_uop: bool) -> Result<Self> {
        let table = if prefer_uop {
            match resolver.resolve_existing("gumpartLegacyMUL.uop") {
                Some(path) => {
                    let archive = UopArchive::open(path, true)?;
                    ResourceTable::from_uop(archive, MAX_GUMP_ID, |id| {
                        format!("build/gumpartlegacymul/{id:08}.tga")
                    })
                }
                None => Self::open_mul(resolver)?,
            }
        } else {
            Self::open_mul(resolver)?
        };

        debug!(entries = table.entry_count(), "gumps loaded");

        Ok(Self { table })
    }

    fn open_mul(resolver: &FileResolver) -> Result<ResourceTable> {
        let container = MulContainer::open(
            resolver.resolve("gumpart.mul"),
            resolver.resolve("gumpidx.mul"),
            MAX_GUMP_ID,
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

    /// Dimensions of a gump without decoding it.
    pub fn dimensions(&self, id: usize) -> Option<(i16, i16)> {
        let entry = self.table.entry(id);
        if entry.is_absent() {
            return None;
        }
        let (w, h) = (entry.extra_hi(), entry.extra_lo());
        (w > 0 && h > 0).then_some((w, h))
    }

    /// Decode a gump sprite.
    pub fn gump(&self, id: usize) -> DecodedFrame {
        let Some((width, height)) = self.dimensions(id) else {
            return DecodedFrame::empty();
        };
        match self.table.bytes(id) {
            Some(bytes) => sprite::decode_gump(&bytes, width, height),
            None => DecodedFrame::empty(),
        }
    }
}
