//! Skill names.
//!
//! `skills.idx`/`skills.mul` is a small indexed table of
//! `{has_action: u8, name: ascii}` records. It earns its place in the core
//! as a verdata patch target (subsystem 16): a patch record rewrites one
//! skill's flag and name from bytes inside the blob.

use tracing::debug;

use crate::io::MulContainer;
use crate::resolve::FileResolver;
use crate::util::Result;

/// One skill record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillEntry {
    pub has_action: bool,
    pub name: String,
}

/// The skills table.
#[derive(Default)]
pub struct SkillsLoader {
    skills: Vec<SkillEntry>,
}

impl SkillsLoader {
    /// Load the skills table.
    pub fn load(resolver: &FileResolver) -> Result<Self> {
        let container = MulContainer::open(
            resolver.resolve("skills.mul"),
            resolver.resolve("skills.idx"),
            0,
        )?;

        let mut skills = Vec::with_capacity(container.entry_count());
        for id in 0..container.entry_count() {
            let entry = match container.entry_slice(id) {
                Some(bytes) if !bytes.is_empty() => parse_skill(bytes),
                _ => SkillEntry::default(),
            };
            skills.push(entry);
        }

        debug!(count = skills.len(), "skills loaded");

        Ok(Self { skills })
    }

    /// Build a table from records directly (tests).
    pub fn from_entries(skills: Vec<SkillEntry>) -> Self {
        Self { skills }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.skills.len()
    }

    #[inline]
    pub fn skill(&self, id: usize) -> Option<&SkillEntry> {
        self.skills.get(id)
    }

    /// Rewrite one skill from a verdata payload.
    pub fn patch_from_bytes(&mut self, id: usize, payload: &[u8]) -> bool {
        let Some(slot) = self.skills.get_mut(id) else {
            return false;
        };
        if payload.is_empty() {
            return false;
        }
        *slot = parse_skill(payload);
        true
    }
}

fn parse_skill(bytes: &[u8]) -> SkillEntry {
    let has_action = bytes[0] != 0;
    let name_bytes = &bytes[1..];
    let end = name_bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(name_bytes.len());
    let name = name_bytes[..end]
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect();

    SkillEntry { has_action, name }
}
