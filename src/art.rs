//! Land and static art.
//!
//! Ids below 0x4000 are land tiles (raw 44x44 diamonds); ids above are
//! static art (run-length sprites). Modern installations pack everything
//! into `artLegacyMUL.uop`; older ones use `art.mul`/`artidx.mul`. The
//! `art.def` overlay aliases missing ids to stand-ins, carrying tile
//! metadata along with the pixels.

use tracing::debug;

use crate::def::DefReader;
use crate::io::{MulContainer, UopArchive};
use crate::resolve::FileResolver;
use crate::sprite::{self, DecodedFrame};
use crate::table::ResourceTable;
use crate::tiledata::{TileData, LAND_TILE_COUNT};
use crate::util::Result;

/// Highest addressable art id (land plus statics).
pub const MAX_ART_ID: usize = 0x14000;

/// The art resource category.
pub struct ArtLoader {
    table: ResourceTable,
    graphic_mask: u16,
}

impl ArtLoader {
    /// Open whichever art container the data directory ships.
    pub fn load(resolver: &FileResolver, prefer_uop: bool) -> Result<Self> {
        let (table, graphic_mask) = if prefer_uop {
            if let Some(path) = resolver.resolve_existing("artLegacyMUL.uop") {
                let archive = UopArchive::open(path, false)?;
                let table = ResourceTable::from_uop(archive, MAX_ART_ID, |id| {
                    format!("build/artlegacymul/{id:08}.tga")
                });
                (table, 0xFFFF)
            } else {
                (Self::open_mul(resolver)?, 0x3FFF)
            }
        } else {
            (Self::open_mul(resolver)?, 0x3FFF)
        };

        debug!(entries = table.entry_count(), "art loaded");

        Ok(Self {
            table,
            graphic_mask,
        })
    }

    fn open_mul(resolver: &FileResolver) -> Result<ResourceTable> {
        let container = MulContainer::open(
            resolver.resolve("art.mul"),
            resolver.resolve("artidx.mul"),
            MAX_ART_ID,
        )?;
        Ok(ResourceTable::from_mul(container))
    }

    /// Build a loader over an already-assembled table (tests).
    pub fn from_table(table: ResourceTable) -> Self {
        Self {
            table,
            graphic_mask: 0xFFFF,
        }
    }

    /// Mask clamping graphic ids to the id space this installation has.
    #[inline]
    pub fn graphic_mask(&self) -> u16 {
        self.graphic_mask
    }

    #[inline]
    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    #[inline]
    pub fn table_mut(&mut self) -> &mut ResourceTable {
        &mut self.table
    }

    /// Decode a land tile by id (`0..0x4000`).
    pub fn land_tile(&self, id: usize) -> DecodedFrame {
        if id >= LAND_TILE_COUNT {
            return DecodedFrame::empty();
        }
        match self.table.bytes(id) {
            Some(bytes) => sprite::decode_land_tile(&bytes),
            None => DecodedFrame::empty(),
        }
    }

    /// Decode a static sprite by static id (0-based, land ids excluded).
    pub fn static_art(&self, static_id: usize) -> DecodedFrame {
        let id = static_id + LAND_TILE_COUNT;
        if id >= self.table.entry_count() {
            return DecodedFrame::empty();
        }
        match self.table.bytes(id) {
            Some(bytes) => sprite::decode_static_art(&bytes),
            None => DecodedFrame::empty(),
        }
    }

    /// Apply the `art.def` overlay.
    ///
    /// Each line aliases a missing id to the first usable alternative, for
    /// both the pixel entry and the tile metadata record. Already-present
    /// ids are left alone.
    pub fn apply_art_def(&mut self, reader: DefReader, tiledata: &mut TileData) {
        let max_id = LAND_TILE_COUNT + tiledata.statics().len();
        let mut aliased = 0usize;

        for line in reader {
            let Some(index) = line.int(0) else { continue };
            let Some(group) = line.group(1) else { continue };

            let index = index as usize;
            if index >= max_id {
                continue;
            }

            for &check in group {
                if check < 0 {
                    continue;
                }
                let check = check as usize;
                if check >= max_id {
                    continue;
                }

                if self.table.entry(index).is_absent() && !self.table.entry(check).is_absent() {
                    self.table.arena_mut().alias(index, check, None);
                    aliased += 1;
                }

                if index < LAND_TILE_COUNT && check < LAND_TILE_COUNT {
                    if tiledata.alias_land(index, check) {
                        break;
                    }
                } else if index >= LAND_TILE_COUNT
                    && check >= LAND_TILE_COUNT
                    && tiledata.alias_static(index - LAND_TILE_COUNT, check - LAND_TILE_COUNT)
                {
                    break;
                }
            }
        }

        debug!(aliased, "applied art.def");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{ByteSource, Entry};

    fn land_payload() -> Vec<u8> {
        std::iter::repeat(0x7FFFu16.to_le_bytes())
            .take(1012)
            .flatten()
            .collect()
    }

    fn table_with_land_at(id: usize) -> ResourceTable {
        let payload = land_payload();
        let mut entries = vec![Entry::ABSENT; LAND_TILE_COUNT + 64];
        entries[id] = Entry {
            offset: 0,
            length: payload.len() as u32,
            ..Entry::ABSENT
        };
        ResourceTable::from_mul(MulContainer::from_parts(
            ByteSource::from_vec(payload),
            entries,
        ))
    }

    #[test]
    fn decodes_land() {
        let art = ArtLoader::from_table(table_with_land_at(3));
        assert_eq!(art.graphic_mask(), 0xFFFF);
        let frame = art.land_tile(3);
        assert_eq!(frame.width, 44);
        assert!(art.land_tile(4).is_empty());
        assert!(art.land_tile(LAND_TILE_COUNT + 5).is_empty());
    }

    #[test]
    fn art_def_aliases_absent_only() {
        let mut art = ArtLoader::from_table(table_with_land_at(0));
        let mut tiledata = TileData::default();

        let def = DefReader::parse("5 {9 0}\n", 2);
        art.apply_art_def(def, &mut tiledata);

        // Alternative 9 is absent, so id 5 falls through to id 0's entry.
        assert_eq!(art.table().entry(5), art.table().entry(0));
        assert!(!art.land_tile(5).is_empty());
    }
}
