//! Multimap availability.
//!
//! The treasure-map overview images (`Multimap.rle`, `facet0*.mul`) load as
//! a category so startup can account for them, but image reconstruction is
//! a collaborator concern; the core exposes which sources exist and their
//! raw bytes.

use tracing::debug;

use crate::io::ByteSource;
use crate::resolve::FileResolver;
use crate::util::Result;

/// Number of facet image files a full installation may carry.
pub const FACET_COUNT: usize = 6;

/// The multimap resource category.
#[derive(Default)]
pub struct MultiMapLoader {
    multimap: Option<ByteSource>,
    facets: Vec<Option<ByteSource>>,
}

impl MultiMapLoader {
    /// Probe the data directory for multimap sources.
    pub fn load(resolver: &FileResolver) -> Result<Self> {
        let multimap = match resolver.resolve_existing("Multimap.rle") {
            Some(path) => Some(ByteSource::open(path)?),
            None => None,
        };

        let mut facets = Vec::with_capacity(FACET_COUNT);
        for i in 0..FACET_COUNT {
            let source = match resolver.resolve_existing(&format!("facet{i:02}.mul")) {
                Some(path) => Some(ByteSource::open(path)?),
                None => None,
            };
            facets.push(source);
        }

        debug!(
            has_multimap = multimap.is_some(),
            facets = facets.iter().filter(|f| f.is_some()).count(),
            "multimap probed"
        );

        Ok(Self { multimap, facets })
    }

    /// True when the RLE overview image exists.
    #[inline]
    pub fn has_multimap(&self) -> bool {
        self.multimap.is_some()
    }

    /// True when the numbered facet image exists.
    pub fn has_facet(&self, facet: usize) -> bool {
        self.facets.get(facet).is_some_and(|f| f.is_some())
    }

    /// Raw multimap bytes.
    pub fn multimap_bytes(&self) -> Option<Vec<u8>> {
        let source = self.multimap.as_ref()?;
        source.read_bytes(0, source.len() as usize).ok()
    }

    /// Raw facet image bytes.
    pub fn facet_bytes(&self, facet: usize) -> Option<Vec<u8>> {
        let source = self.facets.get(facet)?.as_ref()?;
        source.read_bytes(0, source.len() as usize).ok()
    }
}
