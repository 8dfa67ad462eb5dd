//! Tile metadata tables.
//!
//! `tiledata.mul` carries per-tile flags and display data in 32-record
//! groups, land tiles first (a fixed 512 groups), static tiles after. The
//! flag field widened from 32 to 64 bits in 7.0.9.0, so record sizes depend
//! on the client version. Both tables are patch targets: `art.def` aliases
//! records between ids, and verdata subsystem 30 replaces whole groups
//! (always in the old 32-bit layout).

use std::path::Path;

use tracing::trace;

use crate::io::{ByteSource, SliceReader};
use crate::util::{ClientVersion, Result};

/// Land tile ids occupy `0..0x4000`; static art ids start after them.
pub const LAND_TILE_COUNT: usize = 0x4000;

const GROUP_RECORDS: usize = 32;
const LAND_GROUP_COUNT: usize = LAND_TILE_COUNT / GROUP_RECORDS;

/// Metadata for one land tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LandTile {
    pub flags: u64,
    pub texture_id: u16,
}

/// Metadata for one static tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticTile {
    pub flags: u64,
    pub weight: u8,
    pub layer: u8,
    pub count: i32,
    pub anim_id: u16,
    pub hue: u16,
    pub light_index: u16,
    pub height: u8,
}

/// The loaded land and static tile tables.
#[derive(Default)]
pub struct TileData {
    land: Vec<LandTile>,
    statics: Vec<StaticTile>,
}

impl TileData {
    /// Load `tiledata.mul`.
    pub fn load(path: impl AsRef<Path>, version: ClientVersion) -> Result<Self> {
        let source = ByteSource::open(&path)?;
        let bytes = source.read_bytes(0, source.len() as usize)?;
        let mut reader = SliceReader::new(&bytes);

        let wide_flags = version >= ClientVersion::V_7090;

        let mut land = Vec::with_capacity(LAND_TILE_COUNT);
        for _ in 0..LAND_GROUP_COUNT {
            reader.read_u32()?; // group header
            for _ in 0..GROUP_RECORDS {
                land.push(read_land_tile(&mut reader, wide_flags)?);
            }
        }

        let static_record = if wide_flags { 41 } else { 37 };
        let static_group = 4 + GROUP_RECORDS * static_record;
        let static_groups = reader.remaining() / static_group;

        let mut statics = Vec::with_capacity(static_groups * GROUP_RECORDS);
        for _ in 0..static_groups {
            reader.read_u32()?;
            for _ in 0..GROUP_RECORDS {
                statics.push(read_static_tile(&mut reader, wide_flags)?);
            }
        }

        trace!(
            path = %path.as_ref().display(),
            land = land.len(),
            statics = statics.len(),
            "loaded tile data"
        );

        Ok(Self { land, statics })
    }

    #[inline]
    pub fn land(&self) -> &[LandTile] {
        &self.land
    }

    #[inline]
    pub fn statics(&self) -> &[StaticTile] {
        &self.statics
    }

    /// Land record by tile id; out-of-range ids are default records.
    #[inline]
    pub fn land_tile(&self, id: usize) -> LandTile {
        self.land.get(id).copied().unwrap_or_default()
    }

    /// Static record by static id (0-based, land offset already removed).
    #[inline]
    pub fn static_tile(&self, id: usize) -> StaticTile {
        self.statics.get(id).copied().unwrap_or_default()
    }

    /// Alias a land record from another id (art.def); only fills records
    /// that are still default, first writer wins.
    pub fn alias_land(&mut self, dst: usize, src: usize) -> bool {
        if dst >= self.land.len() || src >= self.land.len() {
            return false;
        }
        if self.land[dst] != LandTile::default() || self.land[src] == LandTile::default() {
            return false;
        }
        self.land[dst] = self.land[src];
        true
    }

    /// Alias a static record from another id (art.def), same rules.
    pub fn alias_static(&mut self, dst: usize, src: usize) -> bool {
        if dst >= self.statics.len() || src >= self.statics.len() {
            return false;
        }
        if self.statics[dst] != StaticTile::default() || self.statics[src] == StaticTile::default()
        {
            return false;
        }
        self.statics[dst] = self.statics[src];
        true
    }

    /// Replace one land group from a verdata payload (836-byte, 32-bit
    /// flag layout). `block_id` counts groups from the start of the table.
    pub fn patch_land_group(&mut self, block_id: u32, payload: &[u8]) -> bool {
        let offset = block_id as usize * GROUP_RECORDS;
        if offset + GROUP_RECORDS > self.land.len() {
            return false;
        }

        let mut reader = SliceReader::new(payload);
        if reader.read_u32().is_err() {
            return false;
        }

        let mut tiles = [LandTile::default(); GROUP_RECORDS];
        for tile in tiles.iter_mut() {
            match read_land_tile(&mut reader, false) {
                Ok(t) => *tile = t,
                Err(_) => return false,
            }
        }

        self.land[offset..offset + GROUP_RECORDS].copy_from_slice(&tiles);
        true
    }

    /// Replace one static group from a verdata payload (1188-byte layout).
    /// Static group block ids start at 0x0200, after the land groups.
    pub fn patch_static_group(&mut self, block_id: u32, payload: &[u8]) -> bool {
        let Some(group) = (block_id as usize).checked_sub(LAND_GROUP_COUNT) else {
            return false;
        };
        let offset = group * GROUP_RECORDS;
        if offset + GROUP_RECORDS > self.statics.len() {
            return false;
        }

        let mut reader = SliceReader::new(payload);
        if reader.read_u32().is_err() {
            return false;
        }

        let mut tiles = [StaticTile::default(); GROUP_RECORDS];
        for tile in tiles.iter_mut() {
            match read_static_tile(&mut reader, false) {
                Ok(t) => *tile = t,
                Err(_) => return false,
            }
        }

        self.statics[offset..offset + GROUP_RECORDS].copy_from_slice(&tiles);
        true
    }
}

fn read_flags(reader: &mut SliceReader, wide: bool) -> Result<u64> {
    if wide {
        reader.read_u64()
    } else {
        Ok(reader.read_u32()? as u64)
    }
}

fn read_land_tile(reader: &mut SliceReader, wide: bool) -> Result<LandTile> {
    let flags = read_flags(reader, wide)?;
    let texture_id = reader.read_u16()?;
    reader.skip(20); // name
    Ok(LandTile { flags, texture_id })
}

fn read_static_tile(reader: &mut SliceReader, wide: bool) -> Result<StaticTile> {
    let flags = read_flags(reader, wide)?;
    let weight = reader.read_u8()?;
    let layer = reader.read_u8()?;
    let count = reader.read_i32()?;
    let anim_id = reader.read_u16()?;
    let hue = reader.read_u16()?;
    let light_index = reader.read_u16()?;
    let height = reader.read_u8()?;
    reader.skip(20); // name
    Ok(StaticTile {
        flags,
        weight,
        layer,
        count,
        anim_id,
        hue,
        light_index,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tiledata(static_groups: usize, wide: bool) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();

        for g in 0..LAND_GROUP_COUNT {
            f.write_all(&0u32.to_le_bytes()).unwrap();
            for i in 0..GROUP_RECORDS {
                let flags = (g * GROUP_RECORDS + i) as u64;
                if wide {
                    f.write_all(&flags.to_le_bytes()).unwrap();
                } else {
                    f.write_all(&(flags as u32).to_le_bytes()).unwrap();
                }
                f.write_all(&(flags as u16).to_le_bytes()).unwrap();
                f.write_all(&[0u8; 20]).unwrap();
            }
        }

        for _ in 0..static_groups {
            f.write_all(&0u32.to_le_bytes()).unwrap();
            for i in 0..GROUP_RECORDS {
                if wide {
                    f.write_all(&(i as u64).to_le_bytes()).unwrap();
                } else {
                    f.write_all(&(i as u32).to_le_bytes()).unwrap();
                }
                f.write_all(&[1, 2]).unwrap(); // weight, layer
                f.write_all(&3i32.to_le_bytes()).unwrap();
                f.write_all(&4u16.to_le_bytes()).unwrap();
                f.write_all(&5u16.to_le_bytes()).unwrap();
                f.write_all(&6u16.to_le_bytes()).unwrap();
                f.write_all(&[9]).unwrap(); // height
                f.write_all(&[0u8; 20]).unwrap();
            }
        }

        f.flush().unwrap();
        f
    }

    #[test]
    fn loads_old_layout() {
        let file = write_tiledata(2, false);
        let td = TileData::load(file.path(), ClientVersion::V_7000).unwrap();
        assert_eq!(td.land().len(), LAND_TILE_COUNT);
        assert_eq!(td.statics().len(), 64);
        assert_eq!(td.land_tile(1).flags, 1);
        assert_eq!(td.land_tile(1).texture_id, 1);
        assert_eq!(td.static_tile(3).count, 3);
        assert_eq!(td.static_tile(3).height, 9);
    }

    #[test]
    fn loads_wide_layout() {
        let file = write_tiledata(1, true);
        let td = TileData::load(file.path(), ClientVersion::V_7090).unwrap();
        assert_eq!(td.statics().len(), 32);
        assert_eq!(td.land_tile(100).flags, 100);
    }

    #[test]
    fn verdata_group_patch() {
        let file = write_tiledata(1, false);
        let mut td = TileData::load(file.path(), ClientVersion::V_7000).unwrap();

        // Build an 836-byte land group payload with distinctive flags.
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u32.to_le_bytes());
        for _ in 0..GROUP_RECORDS {
            payload.extend_from_slice(&0xABCDu32.to_le_bytes());
            payload.extend_from_slice(&42u16.to_le_bytes());
            payload.extend_from_slice(&[0u8; 20]);
        }
        assert_eq!(payload.len(), 836);

        assert!(td.patch_land_group(2, &payload));
        assert_eq!(td.land_tile(64).flags, 0xABCD);
        assert_eq!(td.land_tile(64).texture_id, 42);
        assert_eq!(td.land_tile(63).flags, 63);

        // Out-of-range group refused.
        assert!(!td.patch_land_group(u32::MAX / 64, &payload));

        // Static payload: block ids start past the land groups.
        let mut spayload = Vec::new();
        spayload.extend_from_slice(&0u32.to_le_bytes());
        for _ in 0..GROUP_RECORDS {
            spayload.extend_from_slice(&7u32.to_le_bytes());
            spayload.extend_from_slice(&[1, 1]);
            spayload.extend_from_slice(&1i32.to_le_bytes());
            spayload.extend_from_slice(&1u16.to_le_bytes());
            spayload.extend_from_slice(&1u16.to_le_bytes());
            spayload.extend_from_slice(&1u16.to_le_bytes());
            spayload.push(1);
            spayload.extend_from_slice(&[0u8; 20]);
        }
        assert_eq!(spayload.len(), 1188);

        assert!(td.patch_static_group(0x0200, &spayload));
        assert_eq!(td.static_tile(0).flags, 7);
        assert!(!td.patch_static_group(0, &spayload));
    }

    #[test]
    fn art_def_aliasing() {
        let file = write_tiledata(1, false);
        let mut td = TileData::load(file.path(), ClientVersion::V_7000).unwrap();

        // Land id 0 is all-default in the fixture; id 1 is not.
        assert!(td.alias_land(0, 1));
        assert_eq!(td.land_tile(0), td.land_tile(1));
        // Second write refused: first writer wins.
        assert!(!td.alias_land(0, 2));
    }
}
