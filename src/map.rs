//! Map facets and their patch stack.
//!
//! Each facet is an 8x8-tile block grid: the map file stores 196-byte
//! blocks (`header u32` + 64 cells of `{tile u16, z i8}`), and a statics
//! index file points every block at its static-item records. Three things
//! can move a block's data after load: the verdata blob (permanently), and
//! the `mapdif`/`stadif` incremental patch families (toggleable at runtime
//! via [`MapLoader::apply_patches`] / [`MapLoader::reset_patches`], which
//! restore shadow originals bit-for-bit).

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::io::{ByteSource, SliceReader, UopArchive, SENTINEL};
use crate::resolve::FileResolver;
use crate::util::{ClientVersion, Error, Result};

/// Facets a full installation may carry.
pub const MAP_COUNT: usize = 6;

/// Default facet dimensions in tiles.
pub const DEFAULT_MAP_SIZES: [(u32, u32); MAP_COUNT] = [
    (7168, 4096),
    (7168, 4096),
    (2304, 1600),
    (2560, 2048),
    (1448, 1448),
    (1280, 4096),
];

/// One map block: 4-byte header + 64 packed cells.
pub const MAP_BLOCK_SIZE: u64 = 4 + 64 * 3;
/// One statics index record.
const STAIDX_RECORD_SIZE: u64 = 12;
/// One static item record.
const STATIC_RECORD_SIZE: u64 = 7;
/// Verdata static index records use a shortened layout.
const STAIDX_VERDATA_RECORD_SIZE: u32 = 7;
/// Cap on statics per block, as the original clamps.
const MAX_STATICS_PER_BLOCK: u32 = 1024;
/// UOP map archives shard blocks into inner files of this many blocks.
const UOP_BLOCKS_PER_SHARD: usize = 4096;

/// Which physical file a block reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockSource {
    /// No data for this block.
    #[default]
    None,
    /// The facet's own map/statics file.
    Primary,
    /// The mapdif/stadif patch file.
    Diff,
    /// The verdata blob.
    Verdata,
}

/// A resolved byte location for one block's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockRef {
    pub source: BlockSource,
    pub offset: u64,
}

impl BlockRef {
    const NONE: BlockRef = BlockRef {
        source: BlockSource::None,
        offset: 0,
    };

    fn primary(offset: u64) -> Self {
        Self {
            source: BlockSource::Primary,
            offset,
        }
    }
}

/// One block's live addressing plus its shadow original.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexBlock {
    pub map: BlockRef,
    pub statics: BlockRef,
    pub static_count: u32,
    original_map: BlockRef,
    original_statics: BlockRef,
    original_static_count: u32,
}

/// One decoded map cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapCell {
    pub tile_id: u16,
    pub z: i8,
}

/// One decoded static item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticItem {
    pub color: u16,
    pub x: u8,
    pub y: u8,
    pub z: i8,
    pub hue: u16,
}

enum MapBacking {
    Mul(ByteSource),
    Uop(UopArchive),
}

/// One facet's files and block table. Facet 1 may share facet 0's files
/// (Trammel reuses Felucca's data when absent), hence the `Arc`s.
#[derive(Default)]
struct Facet {
    map: Option<Arc<MapBacking>>,
    statics: Option<Arc<ByteSource>>,
    staidx: Option<Arc<ByteSource>>,
    map_dif: Option<ByteSource>,
    map_difl: Option<ByteSource>,
    sta_dif: Option<ByteSource>,
    sta_difi: Option<ByteSource>,
    sta_difl: Option<ByteSource>,
    blocks: Vec<IndexBlock>,
    width_blocks: usize,
    height_blocks: usize,
}

/// The map resource category.
pub struct MapLoader {
    facets: Vec<Facet>,
    map_patch_count: Vec<u32>,
    static_patch_count: Vec<u32>,
    verdata: Option<Arc<ByteSource>>,
}

impl MapLoader {
    /// Open every facet's files and build the block tables.
    pub fn load(resolver: &FileResolver, version: ClientVersion, prefer_uop: bool) -> Result<Self> {
        Self::load_with_sizes(resolver, version, prefer_uop, DEFAULT_MAP_SIZES)
    }

    /// Same as [`MapLoader::load`] with explicit facet dimensions, for
    /// shards (and tests) that override the default layouts.
    pub fn load_with_sizes(
        resolver: &FileResolver,
        version: ClientVersion,
        prefer_uop: bool,
        sizes: [(u32, u32); MAP_COUNT],
    ) -> Result<Self> {
        let mut sizes = sizes;
        let mut facets: Vec<Facet> = Vec::with_capacity(MAP_COUNT);
        let mut found_any = false;

        for i in 0..MAP_COUNT {
            let mut facet = Facet::default();

            let uop_name = format!("map{i}LegacyMUL.uop");
            if prefer_uop && resolver.resolve_existing(&uop_name).is_some() {
                facet.map = Some(Arc::new(MapBacking::Uop(UopArchive::open(
                    resolver.resolve(&uop_name),
                    false,
                )?)));
                found_any = true;
            } else {
                if let Some(path) = resolver.resolve_existing(&format!("map{i}.mul")) {
                    facet.map = Some(Arc::new(MapBacking::Mul(ByteSource::open(path)?)));
                    found_any = true;
                }
                if let Some(path) = resolver.resolve_existing(&format!("mapdifl{i}.mul")) {
                    facet.map_difl = Some(ByteSource::open(path)?);
                    facet.map_dif = open_optional(resolver, &format!("mapdif{i}.mul"))?;
                    facet.sta_difl = open_optional(resolver, &format!("stadifl{i}.mul"))?;
                    facet.sta_difi = open_optional(resolver, &format!("stadifi{i}.mul"))?;
                    facet.sta_dif = open_optional(resolver, &format!("stadif{i}.mul"))?;
                }
            }

            facet.statics = open_optional(resolver, &format!("statics{i}.mul"))?.map(Arc::new);
            facet.staidx = open_optional(resolver, &format!("staidx{i}.mul"))?.map(Arc::new);

            facets.push(facet);
        }

        if !found_any {
            return Err(Error::MandatoryMissing("no map files found".into()));
        }

        // Pre-6.0 installations ship a narrower Felucca/Trammel.
        if let Some(backing) = &facets[0].map {
            if let MapBacking::Mul(source) = backing.as_ref() {
                const V_4011D: ClientVersion = ClientVersion::new(4, 0, 11, 4);
                if source.len() / MAP_BLOCK_SIZE == 393_216 || version < V_4011D {
                    sizes[0].0 = 6144;
                    sizes[1].0 = 6144;
                }
            }
        }

        // Trammel reuses Felucca's files when absent.
        if facets[1].map.is_none() {
            let (felucca, rest) = facets.split_at_mut(1);
            rest[0].map = felucca[0].map.clone();
            rest[0].statics = felucca[0].statics.clone();
            rest[0].staidx = felucca[0].staidx.clone();
        }

        facets
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, facet)| facet.build_blocks(i, sizes[i]));

        debug!(
            facets = facets.iter().filter(|f| f.map.is_some()).count(),
            "maps loaded"
        );

        Ok(Self {
            facets,
            map_patch_count: vec![0; MAP_COUNT],
            static_patch_count: vec![0; MAP_COUNT],
            verdata: None,
        })
    }

    /// Attach the verdata blob for permanently patched blocks.
    pub fn attach_verdata(&mut self, verdata: Arc<ByteSource>) {
        self.verdata = Some(verdata);
    }

    /// True when a facet has map data.
    pub fn has_facet(&self, facet: usize) -> bool {
        self.facets.get(facet).is_some_and(|f| f.map.is_some())
    }

    /// Facet dimensions in blocks.
    pub fn block_dimensions(&self, facet: usize) -> (usize, usize) {
        self.facets
            .get(facet)
            .map(|f| (f.width_blocks, f.height_blocks))
            .unwrap_or((0, 0))
    }

    /// One block's current addressing.
    pub fn block(&self, facet: usize, block: usize) -> Option<&IndexBlock> {
        self.facets.get(facet)?.blocks.get(block)
    }

    /// Decode one map block's cells.
    pub fn map_cells(&self, facet: usize, block: usize) -> Option<(u32, [MapCell; 64])> {
        let f = self.facets.get(facet)?;
        let index = f.blocks.get(block)?;

        let bytes = match index.map.source {
            BlockSource::None => return None,
            BlockSource::Primary => match f.map.as_deref()? {
                MapBacking::Mul(source) => source
                    .slice(index.map.offset, MAP_BLOCK_SIZE as usize)
                    .ok()?,
                MapBacking::Uop(archive) => archive
                    .data()
                    .slice(index.map.offset, MAP_BLOCK_SIZE as usize)
                    .ok()?,
            },
            BlockSource::Diff => f
                .map_dif
                .as_ref()?
                .slice(index.map.offset, MAP_BLOCK_SIZE as usize)
                .ok()?,
            BlockSource::Verdata => self
                .verdata
                .as_deref()?
                .slice(index.map.offset, MAP_BLOCK_SIZE as usize)
                .ok()?,
        };

        let mut reader = SliceReader::new(bytes);
        let header = reader.read_u32().ok()?;
        let mut cells = [MapCell::default(); 64];
        for cell in cells.iter_mut() {
            cell.tile_id = reader.read_u16().ok()?;
            cell.z = reader.read_i8().ok()?;
        }
        Some((header, cells))
    }

    /// Decode one block's static items; missing data is an empty list.
    pub fn static_items(&self, facet: usize, block: usize) -> Vec<StaticItem> {
        let Some(f) = self.facets.get(facet) else {
            return Vec::new();
        };
        let Some(index) = f.blocks.get(block) else {
            return Vec::new();
        };

        let len = index.static_count as usize * STATIC_RECORD_SIZE as usize;
        let bytes = match index.statics.source {
            BlockSource::None => return Vec::new(),
            BlockSource::Primary => f
                .statics
                .as_ref()
                .and_then(|s| s.slice(index.statics.offset, len).ok()),
            BlockSource::Diff => f
                .sta_dif
                .as_ref()
                .and_then(|s| s.slice(index.statics.offset, len).ok()),
            BlockSource::Verdata => self
                .verdata
                .as_deref()
                .and_then(|s| s.slice(index.statics.offset, len).ok()),
        };
        let Some(bytes) = bytes else {
            return Vec::new();
        };

        let mut reader = SliceReader::new(bytes);
        let mut items = Vec::with_capacity(index.static_count as usize);
        for _ in 0..index.static_count {
            let Ok(color) = reader.read_u16() else { break };
            let Ok(x) = reader.read_u8() else { break };
            let Ok(y) = reader.read_u8() else { break };
            let Ok(z) = reader.read_i8() else { break };
            let Ok(hue) = reader.read_u16() else { break };
            items.push(StaticItem { color, x, y, z, hue });
        }
        items
    }

    /// Verdata subsystem 0: permanently repoint a Felucca map block.
    pub fn patch_map_block(&mut self, block: u32, position: u64) {
        let Some(facet) = self.facets.first_mut() else {
            return;
        };
        let Some(index) = facet.blocks.get_mut(block as usize) else {
            return;
        };
        let reference = BlockRef {
            source: BlockSource::Verdata,
            offset: position,
        };
        index.map = reference;
        index.original_map = reference;
    }

    /// Verdata subsystem 2: permanently repoint a Felucca statics block.
    pub fn patch_static_block(&mut self, block: u32, position: u64, length: u32) {
        let Some(facet) = self.facets.first_mut() else {
            return;
        };
        let Some(index) = facet.blocks.get_mut(block as usize) else {
            return;
        };

        let count = (length / STAIDX_VERDATA_RECORD_SIZE).min(MAX_STATICS_PER_BLOCK);
        let reference = BlockRef {
            source: BlockSource::Verdata,
            offset: position,
        };
        index.statics = reference;
        index.original_statics = reference;
        index.static_count = count;
        index.original_static_count = count;
    }

    /// Apply the map-diff patch set described by a login-time patch stream.
    ///
    /// The stream is big-endian: a facet count, then per facet the number
    /// of map and static patches to take from that facet's dif files.
    /// Earlier patches are reset first, so reapplying is idempotent.
    pub fn apply_patches(&mut self, reader: &mut SliceReader<'_>) -> Result<bool> {
        self.reset_patches();

        let announced = reader.read_u32_be()? as usize;
        let patches = announced.min(MAP_COUNT);

        self.map_patch_count.iter_mut().for_each(|c| *c = 0);
        self.static_patch_count.iter_mut().for_each(|c| *c = 0);

        let mut any = false;

        for i in 0..patches {
            if self.facets[i].map.is_none() {
                reader.skip(8);
                continue;
            }

            let map_patches = reader.read_u32_be()?;
            let static_patches = reader.read_u32_be()?;
            self.map_patch_count[i] = map_patches;
            self.static_patch_count[i] = static_patches;

            let facet = &mut self.facets[i];
            let max_block = facet.blocks.len();

            if map_patches != 0 {
                if let (Some(difl), Some(_dif)) = (&facet.map_difl, &facet.map_dif) {
                    let usable = (map_patches as u64).min(difl.len() / 4);

                    for j in 0..usable {
                        let block = difl.read_u32(j * 4)? as usize;
                        if block < max_block {
                            facet.blocks[block].map = BlockRef {
                                source: BlockSource::Diff,
                                offset: j * MAP_BLOCK_SIZE,
                            };
                            any = true;
                        }
                    }
                }
            }

            if static_patches != 0 {
                if let (Some(difl), Some(difi), Some(_dif)) =
                    (&facet.sta_difl, &facet.sta_difi, &facet.sta_dif)
                {
                    let usable = (static_patches as u64).min(difl.len() / 4);

                    for j in 0..usable {
                        let block = difl.read_u32(j * 4)? as usize;
                        let position = difi.read_u32(j * STAIDX_RECORD_SIZE)?;
                        let size = difi.read_u32(j * STAIDX_RECORD_SIZE + 4)?;

                        if block >= max_block {
                            continue;
                        }

                        let target = &mut facet.blocks[block];
                        if size > 0 && position != SENTINEL {
                            target.statics = BlockRef {
                                source: BlockSource::Diff,
                                offset: position as u64,
                            };
                            target.static_count =
                                (size / STATIC_RECORD_SIZE as u32).min(MAX_STATICS_PER_BLOCK);
                        } else {
                            target.statics = BlockRef::NONE;
                            target.static_count = 0;
                        }
                        any = true;
                    }
                }
            }
        }

        trace!(applied = any, "map patches applied");
        Ok(any)
    }

    /// Restore every block to its shadow original.
    pub fn reset_patches(&mut self) {
        for facet in &mut self.facets {
            for block in &mut facet.blocks {
                block.map = block.original_map;
                block.statics = block.original_statics;
                block.static_count = block.original_static_count;
            }
        }
    }

    /// Map patches applied per facet by the last [`MapLoader::apply_patches`].
    pub fn map_patch_count(&self, facet: usize) -> u32 {
        self.map_patch_count.get(facet).copied().unwrap_or(0)
    }

    /// Static patches applied per facet by the last [`MapLoader::apply_patches`].
    pub fn static_patch_count(&self, facet: usize) -> u32 {
        self.static_patch_count.get(facet).copied().unwrap_or(0)
    }
}

impl Facet {
    /// Resolve every block's primary map and statics location.
    fn build_blocks(&mut self, facet_index: usize, size: (u32, u32)) {
        if self.map.is_none() {
            return;
        }

        self.width_blocks = (size.0 >> 3) as usize;
        self.height_blocks = (size.1 >> 3) as usize;
        let block_count = self.width_blocks * self.height_blocks;
        self.blocks = vec![IndexBlock::default(); block_count];

        let map_len = match self.map.as_deref() {
            Some(MapBacking::Mul(source)) => source.len(),
            Some(MapBacking::Uop(archive)) => archive.data().len(),
            None => 0,
        };

        let mut shard_offset = 0u64;
        let mut shard = usize::MAX;

        for block in 0..block_count {
            let mut block_in_file = block;

            if let Some(MapBacking::Uop(archive)) = self.map.as_deref() {
                block_in_file = block & (UOP_BLOCKS_PER_SHARD - 1);
                let wanted = block / UOP_BLOCKS_PER_SHARD;
                if shard != wanted {
                    shard = wanted;
                    shard_offset = archive
                        .resolve_path(&format!("build/map{facet_index}legacymul/{wanted:08}.dat"))
                        .map(|e| e.offset)
                        .unwrap_or(0);
                }
            }

            let map_offset = shard_offset + block_in_file as u64 * MAP_BLOCK_SIZE;
            let index = &mut self.blocks[block];

            if map_offset + MAP_BLOCK_SIZE <= map_len {
                index.map = BlockRef::primary(map_offset);
            }

            if let (Some(staidx), Some(statics)) = (&self.staidx, &self.statics) {
                let record_at = block as u64 * STAIDX_RECORD_SIZE;
                if let (Ok(position), Ok(size)) =
                    (staidx.read_u32(record_at), staidx.read_u32(record_at + 4))
                {
                    if size > 0 && position != SENTINEL && (position as u64) < statics.len() {
                        index.statics = BlockRef::primary(position as u64);
                        index.static_count =
                            (size / STATIC_RECORD_SIZE as u32).min(MAX_STATICS_PER_BLOCK);
                    }
                }
            }

            index.original_map = index.map;
            index.original_statics = index.statics;
            index.original_static_count = index.static_count;
        }
    }
}

fn open_optional(resolver: &FileResolver, name: &str) -> Result<Option<ByteSource>> {
    match resolver.resolve_existing(name) {
        Some(path) => Ok(Some(ByteSource::open(path)?)),
        None => Ok(None),
    }
}
