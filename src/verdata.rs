//! The verdata patch blob.
//!
//! `verdata.mul` is a single binary patch file: a leading record count and
//! fixed 20-byte records `{file_id, block_id, position, length, extra}`.
//! Each record redirects one entry of some subsystem's table to a byte
//! range inside the blob itself. Old clients (before 5.0.0a) require it;
//! later ones apply it when present and requested.

use std::sync::Arc;

use tracing::{info, warn};

use crate::art::ArtLoader;
use crate::gumps::GumpLoader;
use crate::hues::HuesTable;
use crate::io::{ByteSource, SliceReader};
use crate::map::MapLoader;
use crate::multis::MultiLoader;
use crate::skills::SkillsLoader;
use crate::tiledata::TileData;
use crate::util::Result;

/// Subsystem ids a patch record can target.
mod file_id {
    pub const MAP: u32 = 0;
    pub const STATICS: u32 = 2;
    pub const ART: u32 = 4;
    pub const ANIM: u32 = 5;
    pub const ANIM_IDX: u32 = 6;
    pub const GUMPS: u32 = 12;
    pub const MULTIS: u32 = 14;
    pub const SKILLS: u32 = 16;
    pub const TILEDATA: u32 = 30;
    pub const HUES: u32 = 32;
}

/// Verdata payload sizes distinguishing the two tiledata group forms.
const LAND_GROUP_PATCH_LEN: u32 = 836;
const STATIC_GROUP_PATCH_LEN: u32 = 1188;

/// One patch record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchRecord {
    pub file_id: u32,
    pub block_id: u32,
    pub position: u32,
    pub length: u32,
    pub extra: u32,
}

/// Tables a verdata pass may rewrite.
pub struct PatchTargets<'a> {
    pub maps: Option<&'a mut MapLoader>,
    pub art: Option<&'a mut ArtLoader>,
    pub gumps: Option<&'a mut GumpLoader>,
    pub multis: Option<&'a mut MultiLoader>,
    pub skills: Option<&'a mut SkillsLoader>,
    pub tiledata: Option<&'a mut TileData>,
    pub hues: Option<&'a mut HuesTable>,
}

/// The parsed patch blob.
pub struct Verdata {
    source: Arc<ByteSource>,
    patches: Vec<PatchRecord>,
}

impl Verdata {
    /// Open and parse `verdata.mul`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let source = ByteSource::open(path)?;
        Self::from_source(source)
    }

    /// Parse an already-opened blob (tests).
    pub fn from_source(source: ByteSource) -> Result<Self> {
        let bytes = source.read_bytes(0, source.len() as usize)?;
        let mut reader = SliceReader::new(&bytes);

        let count = reader.read_i32()?.max(0) as usize;
        let mut patches = Vec::with_capacity(count);
        for _ in 0..count {
            patches.push(PatchRecord {
                file_id: reader.read_u32()?,
                block_id: reader.read_u32()?,
                position: reader.read_u32()?,
                length: reader.read_u32()?,
                extra: reader.read_u32()?,
            });
        }

        Ok(Self {
            source: Arc::new(source),
            patches,
        })
    }

    /// The blob itself, shared with tables that hold redirected entries.
    #[inline]
    pub fn source(&self) -> Arc<ByteSource> {
        Arc::clone(&self.source)
    }

    #[inline]
    pub fn patches(&self) -> &[PatchRecord] {
        &self.patches
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// The byte range a record points at, when it fits the blob.
    pub fn payload(&self, record: &PatchRecord) -> Option<&[u8]> {
        self.source
            .slice(record.position as u64, record.length as usize)
            .ok()
    }

    /// Apply every patch record to its target table.
    ///
    /// Missing targets and malformed records are skipped with a warning;
    /// this pass never fails an otherwise healthy load.
    pub fn apply(&self, mut targets: PatchTargets<'_>) {
        info!(records = self.patches.len(), "patching with verdata");

        for record in &self.patches {
            match record.file_id {
                file_id::MAP => {
                    if let Some(maps) = targets.maps.as_deref_mut() {
                        maps.patch_map_block(record.block_id, record.position as u64);
                    }
                }
                file_id::STATICS => {
                    if let Some(maps) = targets.maps.as_deref_mut() {
                        maps.patch_static_block(
                            record.block_id,
                            record.position as u64,
                            record.length,
                        );
                    }
                }
                file_id::ART => {
                    if let Some(art) = targets.art.as_deref_mut() {
                        art.table_mut().redirect_to_verdata(
                            record.block_id as usize,
                            record.position as u64,
                            record.length,
                            0,
                        );
                    }
                }
                file_id::GUMPS => {
                    if let Some(gumps) = targets.gumps.as_deref_mut() {
                        gumps.table_mut().redirect_to_verdata(
                            record.block_id as usize,
                            record.position as u64,
                            record.length,
                            record.extra,
                        );
                    }
                }
                file_id::MULTIS => {
                    if let Some(multis) = targets.multis.as_deref_mut() {
                        multis.table_mut().redirect_to_verdata(
                            record.block_id as usize,
                            record.position as u64,
                            record.length,
                            0,
                        );
                    }
                }
                file_id::SKILLS => {
                    if let (Some(skills), Some(payload)) =
                        (targets.skills.as_deref_mut(), self.payload(record))
                    {
                        skills.patch_from_bytes(record.block_id as usize, payload);
                    }
                }
                file_id::TILEDATA => {
                    let Some(tiledata) = targets.tiledata.as_deref_mut() else {
                        continue;
                    };
                    let Some(payload) = self.payload(record) else {
                        continue;
                    };
                    match record.length {
                        LAND_GROUP_PATCH_LEN => {
                            tiledata.patch_land_group(record.block_id, payload);
                        }
                        STATIC_GROUP_PATCH_LEN => {
                            tiledata.patch_static_group(record.block_id, payload);
                        }
                        other => {
                            warn!(length = other, "tiledata patch with unexpected length");
                        }
                    }
                }
                file_id::HUES => {
                    if let (Some(hues), Some(payload)) =
                        (targets.hues.as_deref_mut(), self.payload(record))
                    {
                        hues.patch_group(record.block_id as usize, payload);
                    }
                }
                file_id::ANIM | file_id::ANIM_IDX => {
                    // Animation patches predate every supported client.
                }
                other => {
                    warn!(
                        file_id = other,
                        block_id = record.block_id,
                        "unused verdata block"
                    );
                }
            }
        }

        info!("verdata patching done");
    }
}
