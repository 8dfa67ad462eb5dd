//! Physical file resolution.
//!
//! Loaders name files logically (`"art.mul"`, `"AnimationFrame2.uop"`); the
//! resolver turns those into paths under the data directory. An optional
//! override map (lines of `key=path`) can point individual names anywhere
//! else, and when an exact name is missing the directory is scanned for a
//! case-insensitive match, since install media and shard archives disagree
//! about file-name casing.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::util::{Error, Result};

/// Maps logical resource-file names to physical paths.
pub struct FileResolver {
    base: PathBuf,
    overrides: HashMap<String, PathBuf>,
}

impl FileResolver {
    /// Resolver over a data directory with no overrides.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            overrides: HashMap::new(),
        }
    }

    /// Resolver with an override map file.
    ///
    /// The file holds `key=path` lines (keys compared lowercase, `#`
    /// comments allowed). A missing map file is not an error; an unreadable
    /// one is.
    pub fn with_override_map(base: impl Into<PathBuf>, map_path: impl AsRef<Path>) -> Result<Self> {
        let mut resolver = Self::new(base);

        let text = match fs::read_to_string(map_path.as_ref()) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(resolver),
            Err(e) => return Err(Error::Io(e)),
        };

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                resolver
                    .overrides
                    .insert(key.trim().to_ascii_lowercase(), PathBuf::from(value.trim()));
            }
        }

        debug!(
            overrides = resolver.overrides.len(),
            "loaded file override map"
        );

        Ok(resolver)
    }

    /// The data directory.
    #[inline]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve a logical file name to a physical path.
    ///
    /// The returned path may not exist; callers treat that as "category
    /// disabled" when they open it.
    pub fn resolve(&self, name: &str) -> PathBuf {
        if let Some(over) = self.overrides.get(&name.to_ascii_lowercase()) {
            return over.clone();
        }

        let direct = self.base.join(name);
        if direct.exists() {
            return direct;
        }

        // Fall back to a case-insensitive scan of the parent directory.
        let dir = direct.parent().unwrap_or(&self.base);
        let Ok(listing) = fs::read_dir(dir) else {
            return direct;
        };

        let wanted = name.to_ascii_lowercase();
        let mut matched: Option<PathBuf> = None;
        let mut ambiguous = false;

        for item in listing.flatten() {
            let candidate = item.file_name();
            if candidate.to_string_lossy().to_ascii_lowercase() == wanted {
                if matched.is_some() {
                    ambiguous = true;
                }
                matched = Some(item.path());
            }
        }

        if ambiguous {
            warn!(
                name,
                "multiple files match with ambiguous case; check the data directory for duplicates"
            );
        }

        matched.unwrap_or(direct)
    }

    /// Resolve and check existence in one step.
    pub fn resolve_existing(&self, name: &str) -> Option<PathBuf> {
        let path = self.resolve(name);
        path.exists().then_some(path)
    }
}
