//! Animation index resolution and frame decoding.
//!
//! Animations are the most layered resource category: five legacy
//! data/index file pairs addressed by closed-form offsets, a family of
//! hash-addressed frame archives probed per body and action, and four DEF
//! overlays plus a sequence archive rewriting which body, hue and action a
//! query actually resolves to. [`AnimationLoader`] builds the whole
//! per-body index once at load; frame decoding walks it per query.

mod frames;
mod resolver;

pub use frames::FrameSet;
pub use resolver::{AnimationLoader, BodyConvFlags, BodyIndex, EquipConvData, ResolvedAnimation};

use crate::io::Compression;

/// Action slots per body.
pub const MAX_ACTIONS: usize = 80;
/// Stored facing directions per action (the other three mirror).
pub const MAX_DIRECTIONS: usize = 5;
/// Bodies addressable before `body.def` grows the table.
pub const BODY_COUNT: usize = 2048;
/// One index record: `{position: u32, size: u32, unused: u32}`.
pub const ANIM_IDX_RECORD_SIZE: u64 = 12;

/// Body classification, driving which offset formula applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum AnimGroupType {
    Monster = 0,
    SeaMonster,
    Animal,
    Human,
    Equipment,
    #[default]
    Unknown,
}

/// Per-body behavior flags from `mobtypes.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimFlags(pub u32);

impl AnimFlags {
    pub const USE_2_IF_HIT_WHILE_RUNNING: u32 = 0x0000_0002;
    pub const IDLE_AT_8_FRAME: u32 = 0x0000_0004;
    pub const CAN_FLYING: u32 = 0x0000_0008;
    pub const CALCULATE_OFFSET_LOW_GROUP_EXTENDED: u32 = 0x0000_0020;
    pub const CALCULATE_OFFSET_BY_LOW_GROUP: u32 = 0x0000_0040;
    pub const CALCULATE_OFFSET_BY_PEOPLE_GROUP: u32 = 0x0000_0400;
    pub const USE_UOP_ANIMATION: u32 = 0x0001_0000;
    pub const FOUND: u32 = 0x8000_0000;

    #[inline]
    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    #[inline]
    pub fn uses_uop(self) -> bool {
        self.contains(Self::USE_UOP_ANIMATION)
    }
}

/// The three closed-form index layouts a legacy file interleaves.
///
/// Each legacy index file packs bodies at fixed strides: a body's block of
/// `(action, direction)` records starts at a linear function of its graphic
/// id. Keeping each formula an enum-keyed function keeps them testable in
/// isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaGroup {
    Low,
    High,
    People,
}

impl FormulaGroup {
    /// Byte offset of a body's first index record.
    ///
    /// Negative results (a graphic below the group's base) mean the body
    /// cannot live in this layout; callers treat that as "no animation".
    pub fn offset(self, graphic: u16) -> i64 {
        let g = graphic as i64;
        let record = ANIM_IDX_RECORD_SIZE as i64;
        match self {
            Self::People => ((g - 400) * 175 + 35000) * record,
            Self::High => g * 110 * record,
            Self::Low => ((g - 200) * 65 + 22000) * record,
        }
    }

    /// Actions a body of this layout owns.
    pub fn action_count(self) -> usize {
        match self {
            Self::Low => LOW_ACTION_COUNT,
            Self::High => HIGH_ACTION_COUNT,
            Self::People => PEOPLE_ACTION_COUNT,
        }
    }
}

/// Action counts per layout (walk/stand/die/... repertoires).
pub const LOW_ACTION_COUNT: usize = 13;
pub const HIGH_ACTION_COUNT: usize = 22;
pub const PEOPLE_ACTION_COUNT: usize = 35;

/// Well-known action ids used by death resolution.
pub mod actions {
    pub const HIGH_DIE_1: u8 = 2;
    pub const HIGH_DIE_2: u8 = 3;
    pub const LOW_DIE_1: u8 = 8;
    pub const LOW_DIE_2: u8 = 12;
    pub const PEOPLE_DIE_1: u8 = 21;
    pub const PEOPLE_DIE_2: u8 = 22;
    pub const SEA_MONSTER_DIE: u8 = 8;
}

/// Pick the offset formula and action count for a classified body.
///
/// Monsters can be shunted onto the People or Low layout by mobtypes
/// flags; sea monsters use the High layout's arithmetic with the Low
/// layout's action count.
pub fn classify(typ: AnimGroupType, flags: AnimFlags) -> (FormulaGroup, usize) {
    match typ {
        AnimGroupType::Monster => (flagged_group(flags, FormulaGroup::High), usize::MAX),
        AnimGroupType::SeaMonster => (FormulaGroup::High, LOW_ACTION_COUNT),
        AnimGroupType::Animal => {
            if flags.contains(AnimFlags::CALCULATE_OFFSET_LOW_GROUP_EXTENDED) {
                (flagged_group(flags, FormulaGroup::High), usize::MAX)
            } else {
                (FormulaGroup::Low, usize::MAX)
            }
        }
        _ => (FormulaGroup::People, usize::MAX),
    }
}

fn flagged_group(flags: AnimFlags, fallback: FormulaGroup) -> FormulaGroup {
    if flags.contains(AnimFlags::CALCULATE_OFFSET_BY_PEOPLE_GROUP) {
        FormulaGroup::People
    } else if flags.contains(AnimFlags::CALCULATE_OFFSET_BY_LOW_GROUP) {
        FormulaGroup::Low
    } else {
        fallback
    }
}

/// Resolve a body's index offset and action count in one step.
pub fn resolve_layout(typ: AnimGroupType, flags: AnimFlags, graphic: u16) -> (i64, usize) {
    let (group, count) = classify(typ, flags);
    let count = if count == usize::MAX {
        group.action_count()
    } else {
        count
    };
    (group.offset(graphic), count)
}

/// Classify a body purely from its graphic id range.
///
/// The thresholds depend on which legacy file would hold the body, since
/// each file interleaves the layouts differently.
pub fn classify_by_graphic(graphic: u16, file_index: usize) -> AnimGroupType {
    match file_index {
        1 => {
            if graphic < 200 {
                AnimGroupType::Monster
            } else {
                AnimGroupType::Animal
            }
        }
        2 => {
            if graphic < 300 {
                AnimGroupType::Animal
            } else if graphic < 400 {
                AnimGroupType::Monster
            } else {
                AnimGroupType::Human
            }
        }
        _ => {
            if graphic < 200 {
                AnimGroupType::Monster
            } else if graphic < 400 {
                AnimGroupType::Animal
            } else {
                AnimGroupType::Human
            }
        }
    }
}

/// One `(action, direction)` slot: where that direction's frames live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationDirection {
    pub position: u64,
    pub size: u32,
    pub uncompressed_size: u32,
    pub compression: Compression,
}

impl AnimationDirection {
    /// True when no frames exist for this slot.
    #[inline]
    pub fn is_absent(&self) -> bool {
        self.position == 0 && self.size == 0
    }
}

/// One action's five stored directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimationGroup {
    pub directions: [AnimationDirection; MAX_DIRECTIONS],
}

/// One action slot resolved into a hash archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct UopSlot {
    pub file_index: usize,
    pub data: AnimationDirection,
}

impl UopSlot {
    #[inline]
    pub fn is_absent(&self) -> bool {
        self.data.is_absent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn people_formula() {
        // Body 400 is the first People body: offset 35000 records.
        assert_eq!(
            FormulaGroup::People.offset(400),
            35000 * ANIM_IDX_RECORD_SIZE as i64
        );
        assert_eq!(
            FormulaGroup::People.offset(401),
            35175 * ANIM_IDX_RECORD_SIZE as i64
        );
        // Below the base the layout cannot hold the body.
        assert!(FormulaGroup::People.offset(0) < 0);
    }

    #[test]
    fn high_formula() {
        assert_eq!(FormulaGroup::High.offset(0), 0);
        assert_eq!(
            FormulaGroup::High.offset(3),
            330 * ANIM_IDX_RECORD_SIZE as i64
        );
    }

    #[test]
    fn low_formula() {
        assert_eq!(
            FormulaGroup::Low.offset(200),
            22000 * ANIM_IDX_RECORD_SIZE as i64
        );
        assert_eq!(
            FormulaGroup::Low.offset(201),
            22065 * ANIM_IDX_RECORD_SIZE as i64
        );
    }

    #[test]
    fn sea_monster_mixes_layouts() {
        let (offset, count) = resolve_layout(AnimGroupType::SeaMonster, AnimFlags(0), 150);
        assert_eq!(offset, FormulaGroup::High.offset(150));
        assert_eq!(count, LOW_ACTION_COUNT);
    }

    #[test]
    fn monster_flag_overrides() {
        let people = AnimFlags(AnimFlags::CALCULATE_OFFSET_BY_PEOPLE_GROUP);
        let (group, _) = classify(AnimGroupType::Monster, people);
        assert_eq!(group, FormulaGroup::People);

        let low = AnimFlags(AnimFlags::CALCULATE_OFFSET_BY_LOW_GROUP);
        let (group, _) = classify(AnimGroupType::Monster, low);
        assert_eq!(group, FormulaGroup::Low);

        let (group, _) = classify(AnimGroupType::Monster, AnimFlags(0));
        assert_eq!(group, FormulaGroup::High);
    }

    #[test]
    fn animal_extended_offsets() {
        let extended = AnimFlags(
            AnimFlags::CALCULATE_OFFSET_LOW_GROUP_EXTENDED
                | AnimFlags::CALCULATE_OFFSET_BY_PEOPLE_GROUP,
        );
        let (group, _) = classify(AnimGroupType::Animal, extended);
        assert_eq!(group, FormulaGroup::People);

        let (group, _) = classify(AnimGroupType::Animal, AnimFlags(0));
        assert_eq!(group, FormulaGroup::Low);
    }

    #[test]
    fn graphic_range_classification() {
        // File 0 thresholds.
        assert_eq!(classify_by_graphic(0, 0), AnimGroupType::Monster);
        assert_eq!(classify_by_graphic(250, 0), AnimGroupType::Animal);
        assert_eq!(classify_by_graphic(400, 0), AnimGroupType::Human);
        // File 1 holds only monsters and animals.
        assert_eq!(classify_by_graphic(150, 1), AnimGroupType::Monster);
        assert_eq!(classify_by_graphic(450, 1), AnimGroupType::Animal);
        // File 2 leads with animals.
        assert_eq!(classify_by_graphic(100, 2), AnimGroupType::Animal);
        assert_eq!(classify_by_graphic(350, 2), AnimGroupType::Monster);
        assert_eq!(classify_by_graphic(500, 2), AnimGroupType::Human);
    }
}
