//! Sound entries.
//!
//! Sounds participate in the parallel load as an entry table; waveform
//! handling lives with the audio collaborator. Each MUL payload begins with
//! a 16-byte name field followed by raw sample data, so the loader can
//! at least report names without owning playback.

use tracing::debug;

use crate::io::{MulContainer, SliceReader, UopArchive};
use crate::resolve::FileResolver;
use crate::table::ResourceTable;
use crate::util::Result;

/// Highest addressable sound id.
pub const MAX_SOUND_ID: usize = 0x1000;

/// The sound resource category.
pub struct SoundLoader {
    table: ResourceTable,
}

impl SoundLoader {
    /// Open whichever sound container the data directory ships.
    pub fn load(resolver: &FileResolver, prefer_uop: bool) -> Result<Self> {
        let table = if prefer_uop {
            match resolver.resolve_existing("soundLegacyMUL.uop") {
                Some(path) => {
                    let archive = UopArchive::open(path, false)?;
                    ResourceTable::from_uop(archive, MAX_SOUND_ID, |id| {
                        format!("build/soundlegacymul/{id:08}.dat")
                    })
                }
                None => Self::open_mul(resolver)?,
            }
        } else {
            Self::open_mul(resolver)?
        };

        debug!(entries = table.entry_count(), "sounds loaded");

        Ok(Self { table })
    }

    fn open_mul(resolver: &FileResolver) -> Result<ResourceTable> {
        let container = MulContainer::open(
            resolver.resolve("sound.mul"),
            resolver.resolve("soundidx.mul"),
            MAX_SOUND_ID,
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

    /// Name embedded in a sound payload's header.
    pub fn sound_name(&self, id: usize) -> Option<String> {
        let bytes = self.table.bytes(id)?;
        let mut reader = SliceReader::new(&bytes);
        reader.read_ascii(16).ok()
    }

    /// Raw sample bytes past the name header.
    pub fn sample_bytes(&self, id: usize) -> Option<Vec<u8>> {
        let bytes = self.table.bytes(id)?;
        (bytes.len() > 16).then(|| bytes[16..].to_vec())
    }
}
