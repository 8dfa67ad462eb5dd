//! Animation index construction and body/action resolution.
//!
//! The per-body index is assembled in passes, in this order:
//!
//! 1. the legacy `anim*.mul`/`anim*.idx` pairs and (on UOP installations)
//!    the `AnimationFrame*.uop` archives are opened;
//! 2. every body/action pair is probed against the archives and
//!    `AnimationSequence.uop` rewires replaced actions;
//! 3. `mobtypes.txt` classifies bodies and sets their behavior flags;
//! 4. the primary index file is walked with the closed-form offsets;
//! 5. the DEF overlays run: `anim1/anim2.def` group replacements,
//!    `equipconv.def`, `body.def`/`corpse.def` aliases, and finally
//!    `bodyconv.def`, which can move a body onto a secondary file.
//!
//! Every pass is tolerant: a malformed line or an out-of-range id is
//! skipped, never fatal.

use std::collections::HashMap;
use std::fs;

use bytemuck::{Pod, Zeroable};
use tracing::{debug, trace, warn};

use crate::def::DefReader;
use crate::io::{ByteSource, Entry, SliceReader, UopArchive, SENTINEL};
use crate::resolve::FileResolver;
use crate::util::{ClientVersion, Result};

use super::{
    classify_by_graphic, resolve_layout, AnimFlags, AnimGroupType, AnimationDirection,
    AnimationGroup, FormulaGroup, UopSlot, ANIM_IDX_RECORD_SIZE, BODY_COUNT, MAX_ACTIONS,
    MAX_DIRECTIONS,
};

/// Archives probed per body/action, in priority order.
const UOP_FILE_COUNT: usize = 10;
/// Legacy data/index pairs (`anim.mul` plus `anim2..anim5`).
const LEGACY_FILE_COUNT: usize = 5;

/// One record of a legacy animation index file.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C, packed)]
struct AnimIdxRecord {
    position: u32,
    size: u32,
    unused: u32,
}

/// Which secondary legacy files the shard allows `bodyconv.def` to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BodyConvFlags(pub u32);

impl BodyConvFlags {
    pub const ANIM1: u32 = 0x01;
    pub const ANIM2: u32 = 0x02;
    pub const ANIM3: u32 = 0x04;
    pub const ANIM4: u32 = 0x08;
    pub const ANIM5: u32 = 0x10;

    /// Every secondary file allowed.
    pub fn all() -> Self {
        Self(Self::ANIM1 | Self::ANIM2 | Self::ANIM3 | Self::ANIM4 | Self::ANIM5)
    }

    #[inline]
    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }
}

/// Equipment conversion record from `equipconv.def`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquipConvData {
    pub graphic: u16,
    pub gump: u16,
    pub hue: u16,
}

/// The outcome of body/action/hue remapping for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAnimation {
    pub graphic: u16,
    pub action: u8,
    pub hue: u16,
    pub use_uop: bool,
}

/// Everything known about one body graphic.
pub struct BodyIndex {
    pub graphic: u16,
    pub corpse_graphic: u16,
    pub hue: u16,
    pub corpse_hue: u16,
    pub file_index: usize,
    pub typ: AnimGroupType,
    pub flags: AnimFlags,
    pub is_valid_mul: bool,
    pub mounted_height_offset: i8,
    pub groups: Box<[AnimationGroup]>,
    uop_groups: Option<Box<[UopSlot]>>,
    uop_replace: [u8; MAX_ACTIONS],
}

impl BodyIndex {
    fn new(graphic: u16) -> Self {
        let mut uop_replace = [0u8; MAX_ACTIONS];
        for (i, slot) in uop_replace.iter_mut().enumerate() {
            *slot = i as u8;
        }

        Self {
            graphic,
            corpse_graphic: graphic,
            hue: 0,
            corpse_hue: 0,
            file_index: 0,
            typ: AnimGroupType::Unknown,
            flags: AnimFlags(0),
            is_valid_mul: false,
            mounted_height_offset: 0,
            groups: vec![AnimationGroup::default(); MAX_ACTIONS].into_boxed_slice(),
            uop_groups: None,
            uop_replace,
        }
    }

    /// True when this body's frames live in the hash archives.
    #[inline]
    pub fn is_uop(&self) -> bool {
        self.flags.uses_uop()
    }

    /// True when any archive slot matched during probing.
    #[inline]
    pub fn has_uop_slots(&self) -> bool {
        self.uop_groups.is_some()
    }

    /// The archive slot an action resolves to, after replaced-action
    /// remapping. Returns the remapped action alongside.
    pub fn uop_slot(&self, action: u8) -> Option<(u8, &UopSlot)> {
        if action as usize >= MAX_ACTIONS {
            return None;
        }
        let remapped = self.uop_replace[action as usize];
        let slot = self.uop_groups.as_ref()?.get(remapped as usize)?;
        Some((remapped, slot))
    }

    /// The archive slot for an already-remapped action (frame decoding
    /// runs after [`AnimationLoader::replace_animation_values`], which has
    /// applied the replaced-action table).
    pub fn uop_direct(&self, action: u8) -> Option<&UopSlot> {
        self.uop_groups.as_ref()?.get(action as usize)
    }

    /// Direction slot for a legacy query.
    pub fn direction(&self, action: u8, direction: u8) -> Option<&AnimationDirection> {
        self.groups
            .get(action as usize)?
            .directions
            .get(direction as usize)
    }

    fn ensure_uop_groups(&mut self) -> &mut [UopSlot] {
        self.uop_groups
            .get_or_insert_with(|| vec![UopSlot::default(); MAX_ACTIONS].into_boxed_slice())
    }

    fn replace_uop_group(&mut self, old: u8, new: u8) {
        if (old as usize) < MAX_ACTIONS && (new as usize) < MAX_ACTIONS {
            self.uop_replace[old as usize] = new;
        }
    }
}

pub(super) struct AnimFile {
    pub(super) data: ByteSource,
    pub(super) idx: ByteSource,
}

/// The animation resource category.
pub struct AnimationLoader {
    files: Vec<Option<AnimFile>>,
    uop_files: Vec<Option<UopArchive>>,
    bodies: Vec<BodyIndex>,
    equip_conv: HashMap<u16, HashMap<u16, EquipConvData>>,
    group_replaces: [Vec<(u16, u8)>; 2],
}

impl AnimationLoader {
    /// Load the whole animation index.
    ///
    /// `conv_flags` gates which secondary files `bodyconv.def` may move a
    /// body onto; shards signal this at login, a standalone reader passes
    /// [`BodyConvFlags::all`].
    pub fn load(
        resolver: &FileResolver,
        version: ClientVersion,
        prefer_uop: bool,
        conv_flags: BodyConvFlags,
    ) -> Result<Self> {
        let mut loader = Self {
            files: (0..LEGACY_FILE_COUNT).map(|_| None).collect(),
            uop_files: (0..UOP_FILE_COUNT).map(|_| None).collect(),
            bodies: (0..BODY_COUNT as u16).map(BodyIndex::new).collect(),
            equip_conv: HashMap::new(),
            group_replaces: [Vec::new(), Vec::new()],
        };

        for i in 0..LEGACY_FILE_COUNT {
            let suffix = if i == 0 {
                String::new()
            } else {
                (i + 1).to_string()
            };
            let mul = resolver.resolve_existing(&format!("anim{suffix}.mul"));
            let idx = resolver.resolve_existing(&format!("anim{suffix}.idx"));
            if let (Some(mul), Some(idx)) = (mul, idx) {
                loader.files[i] = Some(AnimFile {
                    data: ByteSource::open(mul)?,
                    idx: ByteSource::open(idx)?,
                });
            }
        }

        let mut any_uop = false;
        if prefer_uop && version > ClientVersion::V_60144 {
            for (i, slot) in loader.uop_files.iter_mut().enumerate() {
                if let Some(path) = resolver.resolve_existing(&format!("AnimationFrame{}.uop", i + 1))
                {
                    *slot = Some(UopArchive::open(path, false)?);
                    any_uop = true;
                }
            }
        }

        if any_uop {
            loader.probe_uop_slots();
            loader.load_sequence_remaps(resolver);
        }

        if version >= ClientVersion::V_500A {
            loader.load_mobtypes(resolver);
        }

        loader.build_primary_index();
        loader.load_group_replaces(resolver);

        if version >= ClientVersion::V_300 {
            loader.load_equip_conv(resolver);
            loader.load_body_def(resolver, false);
            loader.load_body_def(resolver, true);
            loader.load_body_conv(resolver, version, conv_flags);
        }

        debug!(
            legacy_files = loader.files.iter().filter(|f| f.is_some()).count(),
            uop_files = loader.uop_files.iter().filter(|f| f.is_some()).count(),
            "animations loaded"
        );

        Ok(loader)
    }

    /// Number of addressable bodies (grows past 2048 via `body.def`).
    #[inline]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Everything known about a body.
    #[inline]
    pub fn body(&self, graphic: u16) -> Option<&BodyIndex> {
        self.bodies.get(graphic as usize)
    }

    /// A body's classification; absent bodies are Unknown.
    pub fn anim_type(&self, graphic: u16) -> AnimGroupType {
        self.body(graphic).map(|b| b.typ).unwrap_or_default()
    }

    /// A body's behavior flags.
    pub fn anim_flags(&self, graphic: u16) -> AnimFlags {
        self.body(graphic).map(|b| b.flags).unwrap_or_default()
    }

    /// Rider offset for mount bodies.
    pub fn mounted_height_offset(&self, graphic: u16) -> i8 {
        self.body(graphic)
            .map(|b| b.mounted_height_offset)
            .unwrap_or(0)
    }

    /// Equipment conversion lookup.
    pub fn equip_conv(&self, body: u16, graphic: u16) -> Option<EquipConvData> {
        self.equip_conv.get(&body)?.get(&graphic).copied()
    }

    /// Group replacement lists from `anim1.def` (0) and `anim2.def` (1).
    pub fn group_replaces(&self, set: usize) -> &[(u16, u8)] {
        self.group_replaces
            .get(set)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The legacy file pair a body resolves into.
    pub(super) fn legacy_file(&self, file_index: usize) -> Option<&AnimFile> {
        self.files.get(file_index)?.as_ref()
    }

    pub(super) fn uop_archive(&self, file_index: usize) -> Option<&UopArchive> {
        self.uop_files.get(file_index)?.as_ref()
    }

    /// Resolve which body, action and hue a query actually uses.
    ///
    /// UOP-animated bodies win whenever they are the only data or the query
    /// is not for equipment; legacy bodies resolved from the primary file
    /// take their `body.def`/`corpse.def` alias and hue.
    pub fn replace_animation_values(
        &self,
        graphic: u16,
        action: u8,
        hue: u16,
        is_equip: bool,
        is_corpse: bool,
        force_uop: bool,
    ) -> ResolvedAnimation {
        let mut resolved = ResolvedAnimation {
            graphic,
            action,
            hue,
            use_uop: false,
        };

        let Some(index) = self.body(graphic) else {
            return resolved;
        };
        if action as usize >= MAX_ACTIONS {
            return resolved;
        }

        if force_uop || (index.is_uop() && (!index.is_valid_mul || !is_equip)) {
            if let Some((remapped, _)) = index.uop_slot(action) {
                resolved.action = remapped;
            }
            resolved.use_uop = true;
            return resolved;
        }

        // body.def replacements live in the primary file only; bodyconv
        // bodies already point at their converted graphic.
        if index.file_index == 0 {
            if is_corpse {
                resolved.graphic = index.corpse_graphic;
                resolved.hue = index.corpse_hue;
            } else {
                resolved.graphic = index.graphic;
                resolved.hue = index.hue;
            }
        }

        resolved
    }

    /// Whether any direction of an action has frames.
    pub fn is_animation_present(&self, graphic: u16, action: u8) -> bool {
        let resolved = self.replace_animation_values(graphic, action, 0, false, false, false);
        let Some(index) = self.body(resolved.graphic) else {
            return false;
        };

        if resolved.use_uop {
            return index
                .uop_slot(resolved.action)
                .is_some_and(|(_, slot)| !slot.is_absent());
        }

        (0..MAX_DIRECTIONS as u8).any(|d| {
            index
                .direction(resolved.action, d)
                .is_some_and(|dir| !dir.is_absent())
        })
    }

    /// The death action id for a body.
    pub fn death_action(&self, graphic: u16, second: bool, running: bool) -> u8 {
        use super::actions;

        let Some(index) = self.body(graphic) else {
            return 0;
        };
        let flags = index.flags;

        match index.typ {
            AnimGroupType::Animal => {
                if flags.contains(AnimFlags::USE_2_IF_HIT_WHILE_RUNNING)
                    || flags.contains(AnimFlags::CAN_FLYING)
                {
                    2
                } else if flags.uses_uop() {
                    if second {
                        3
                    } else {
                        2
                    }
                } else if second {
                    actions::LOW_DIE_2
                } else {
                    actions::LOW_DIE_1
                }
            }
            AnimGroupType::SeaMonster if !running => actions::SEA_MONSTER_DIE,
            AnimGroupType::SeaMonster | AnimGroupType::Monster => {
                if flags.uses_uop() {
                    if second {
                        3
                    } else {
                        2
                    }
                } else if second {
                    actions::HIGH_DIE_2
                } else {
                    actions::HIGH_DIE_1
                }
            }
            AnimGroupType::Human | AnimGroupType::Equipment => {
                if second {
                    actions::PEOPLE_DIE_2
                } else {
                    actions::PEOPLE_DIE_1
                }
            }
            AnimGroupType::Unknown => 0,
        }
    }

    /// The action layout a body draws from (High when unknown).
    pub fn layout_group(&self, graphic: u16) -> FormulaGroup {
        match self.anim_type(graphic) {
            AnimGroupType::Animal => FormulaGroup::Low,
            AnimGroupType::Human | AnimGroupType::Equipment => FormulaGroup::People,
            _ => FormulaGroup::High,
        }
    }

    // ---- load passes -----------------------------------------------------

    fn probe_uop_slots(&mut self) {
        let uop_files = &self.uop_files;
        let bodies = &mut self.bodies;
        let mut matched = 0usize;

        for (body_id, body) in bodies.iter_mut().enumerate().take(BODY_COUNT) {
            for action in 0..MAX_ACTIONS {
                let path = format!("build/animationlegacyframe/{body_id:06}/{action:02}.bin");
                let hash = uop_hash::hash_path(&path);

                for (file_index, archive) in uop_files.iter().enumerate() {
                    let Some(archive) = archive else { continue };
                    let Some(entry) = archive.resolve(hash) else {
                        continue;
                    };

                    let slot = UopSlot {
                        file_index,
                        data: AnimationDirection {
                            position: entry.offset,
                            size: entry.length,
                            uncompressed_size: entry.decompressed_length,
                            compression: entry.compression,
                        },
                    };
                    body.ensure_uop_groups()[action] = slot;
                    matched += 1;
                    break;
                }
            }
        }

        trace!(slots = matched, "probed uop animation archives");
    }

    fn load_sequence_remaps(&mut self, resolver: &FileResolver) {
        let Some(path) = resolver.resolve_existing("AnimationSequence.uop") else {
            warn!("AnimationSequence.uop not found");
            return;
        };
        let archive = match UopArchive::open(path, false) {
            Ok(archive) => archive,
            Err(e) => {
                warn!(error = %e, "AnimationSequence.uop unreadable");
                return;
            }
        };

        let count = archive.total_entries().max(self.bodies.len());
        let mut entries = vec![Entry::ABSENT; count];
        archive.fill_entries(&mut entries, |i| format!("build/animationsequence/{i:08}.bin"));

        for entry in entries.iter().filter(|e| !e.is_absent()) {
            let Some(raw) = archive.entry_slice(entry) else {
                continue;
            };
            let bytes = match crate::io::decompress(
                entry.compression,
                raw,
                entry.decompressed_length as usize,
            ) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "animation sequence entry skipped");
                    continue;
                }
            };

            let mut reader = SliceReader::new(&bytes);
            let Ok(anim_id) = reader.read_u32() else {
                continue;
            };
            if anim_id as usize >= self.bodies.len() {
                continue;
            }
            reader.skip(48);
            let Ok(replaces) = reader.read_i32() else {
                continue;
            };

            // 48 and 68 mark placeholder sequences with nothing to apply.
            if replaces == 48 || replaces == 68 {
                continue;
            }

            for _ in 0..replaces.max(0) {
                let Ok(old_action) = reader.read_i32() else {
                    break;
                };
                let Ok(frame_count) = reader.read_u32() else {
                    break;
                };
                let Ok(new_action) = reader.read_i32() else {
                    break;
                };

                if frame_count == 0 {
                    self.bodies[anim_id as usize]
                        .replace_uop_group(old_action as u8, new_action as u8);
                }

                reader.skip(60);
            }

            // Known mount bodies carry their rider offset here.
            let offset = match anim_id {
                0x04E6 | 0x04E7 | 0x042D | 0x05F7 | 0x05A1 => 18,
                0x01B0 | 0x0579 | 0x05F6 | 0x05A0 => 9,
                _ => 0,
            };
            if offset != 0 {
                self.bodies[anim_id as usize].mounted_height_offset = offset;
            }
        }
    }

    fn load_mobtypes(&mut self, resolver: &FileResolver) {
        let Some(path) = resolver.resolve_existing("mobtypes.txt") else {
            return;
        };
        let Ok(text) = fs::read_to_string(path) else {
            return;
        };

        const TYPE_NAMES: [(&str, AnimGroupType); 5] = [
            ("monster", AnimGroupType::Monster),
            ("sea_monster", AnimGroupType::SeaMonster),
            ("animal", AnimGroupType::Animal),
            ("human", AnimGroupType::Human),
            ("equipment", AnimGroupType::Equipment),
        ];

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || !line.as_bytes()[0].is_ascii_digit() {
                continue;
            }

            let mut parts = line.split_whitespace();
            let (Some(id), Some(name), Some(number)) = (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };

            let Ok(id) = id.parse::<usize>() else {
                continue;
            };
            if id >= self.bodies.len() {
                continue;
            }

            // The flag column may run straight into a comment.
            let number = number.split('#').next().unwrap_or("");
            let Ok(number) = u32::from_str_radix(number, 16) else {
                continue;
            };

            let Some(&(_, typ)) = TYPE_NAMES
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
            else {
                continue;
            };

            let body = &mut self.bodies[id];
            body.typ = typ;
            body.flags = AnimFlags(AnimFlags::FOUND | number);
        }
    }

    /// Walk the primary index file with the closed-form offsets.
    fn build_primary_index(&mut self) {
        let Some(file) = self.files[0].as_ref() else {
            return;
        };
        let idx_len = file.idx.len();
        let bodies = &mut self.bodies;

        for (body_id, body) in bodies.iter_mut().enumerate().take(BODY_COUNT) {
            if body.typ == AnimGroupType::Unknown {
                body.typ = classify_by_graphic(body_id as u16, 0);
            }

            let (offset, action_count) = resolve_layout(body.typ, body.flags, body_id as u16);
            let action_count = action_count.min(MAX_ACTIONS);

            let span = (action_count * MAX_DIRECTIONS) as u64 * ANIM_IDX_RECORD_SIZE;
            if offset < 0 || offset as u64 + span > idx_len {
                continue;
            }

            let Ok(block) = file.idx.read_bytes(offset as u64, span as usize) else {
                continue;
            };
            let mut reader = SliceReader::new(&block);
            let mut is_valid = false;

            for action in 0..action_count {
                for direction in 0..MAX_DIRECTIONS {
                    let Ok(record) = reader.read_record::<AnimIdxRecord>() else {
                        break;
                    };
                    let (position, size) = (record.position, record.size);

                    if position != SENTINEL && size != SENTINEL && size != 0 {
                        body.groups[action].directions[direction] = AnimationDirection {
                            position: position as u64,
                            size,
                            ..AnimationDirection::default()
                        };
                        is_valid = true;
                    }
                }
            }

            body.is_valid_mul = is_valid;
        }
    }

    fn load_group_replaces(&mut self, resolver: &FileResolver) {
        for (set, name) in ["anim1.def", "anim2.def"].iter().enumerate() {
            let Some(path) = resolver.resolve_existing(name) else {
                continue;
            };
            let Ok(reader) = DefReader::open(path, 2) else {
                continue;
            };

            for line in reader {
                let (Some(group), Some(replace)) = (line.int(0), line.int(1)) else {
                    continue;
                };
                if group == 0xFFFF {
                    continue;
                }
                self.group_replaces[set].push((group as u16, replace as u8));
            }
        }
    }

    fn load_equip_conv(&mut self, resolver: &FileResolver) {
        let Some(path) = resolver.resolve_existing("equipconv.def") else {
            return;
        };
        let Ok(reader) = DefReader::open(path, 5) else {
            return;
        };

        for line in reader {
            let (Some(body), Some(graphic), Some(new_graphic), Some(gump), Some(hue)) = (
                line.int(0),
                line.int(1),
                line.int(2),
                line.int(3),
                line.int(4),
            ) else {
                continue;
            };

            let in_range = |v: i64| v >= 0 && (v as usize) < self.bodies.len();
            if !in_range(body) || !in_range(graphic) || !in_range(new_graphic) {
                continue;
            }
            if gump > u16::MAX as i64 {
                continue;
            }

            let gump = match gump {
                0 => graphic,
                -1 | 0xFFFF => new_graphic,
                other => other,
            };

            self.equip_conv.entry(body as u16).or_default().insert(
                graphic as u16,
                EquipConvData {
                    graphic: new_graphic as u16,
                    gump: gump as u16,
                    hue: hue as u16,
                },
            );
        }
    }

    /// Apply `body.def` (`corpse == false`) or `corpse.def`.
    fn load_body_def(&mut self, resolver: &FileResolver, corpse: bool) {
        let name = if corpse { "corpse.def" } else { "body.def" };
        let Some(path) = resolver.resolve_existing(name) else {
            return;
        };
        let Ok(reader) = DefReader::open(path, 2) else {
            return;
        };

        let mut seen: HashMap<usize, ()> = HashMap::new();

        for line in reader {
            let (Some(index), Some(group)) = (line.int(0), line.group(1)) else {
                continue;
            };
            if index < 0 {
                continue;
            }
            let index = index as usize;

            self.grow_to(index);

            if seen.contains_key(&index) {
                continue;
            }

            let hue = line.int(2).unwrap_or(0);

            // The third alternative wins when present; that is how the
            // original file format is consumed.
            let check = if group.len() >= 3 { group[2] } else { group[0] };
            if check < 0 || check as usize >= self.bodies.len() {
                continue;
            }

            let body = &mut self.bodies[index];
            if corpse {
                body.corpse_graphic = check as u16;
                body.corpse_hue = hue as u16;
            } else {
                body.graphic = check as u16;
                body.hue = hue as u16;
            }
            body.is_valid_mul = true;

            seen.insert(index, ());
        }
    }

    fn load_body_conv(
        &mut self,
        resolver: &FileResolver,
        version: ClientVersion,
        conv_flags: BodyConvFlags,
    ) {
        let Some(path) = resolver.resolve_existing("bodyconv.def") else {
            return;
        };
        let Ok(reader) = DefReader::open(path, 2) else {
            return;
        };

        for line in reader {
            let Some(index) = line.int(0) else { continue };
            if index < 0 || index as usize >= self.bodies.len() {
                continue;
            }
            let index = index as usize;

            for column in 1..line.parts_count() {
                let Some(body) = line.int(column) else {
                    continue;
                };
                if body < 0 || body as usize >= self.bodies.len() {
                    continue;
                }
                let body = body as u16;

                // Columns map to anim2..anim5; the shard only unlocks the
                // first two explicitly, later files are always accepted.
                let allowed = match column {
                    1 => conv_flags.contains(BodyConvFlags::ANIM1),
                    2 => conv_flags.contains(BodyConvFlags::ANIM2),
                    _ => true,
                };
                if !allowed {
                    continue;
                }

                let mounted_offset = match column {
                    1 if index == 0x00C0 || index == 793 => -9,
                    2 if index == 0x0579 => 9,
                    4 => match index {
                        0x0115 | 0x00C0 => 0,
                        0x042D => 3,
                        _ => -9,
                    },
                    _ => 0,
                };

                if self.apply_body_conversion(index, body, column, version, mounted_offset) {
                    break;
                }
            }
        }
    }

    /// Move one body onto a secondary legacy file. Returns whether the
    /// conversion took.
    fn apply_body_conversion(
        &mut self,
        index: usize,
        body: u16,
        file_index: usize,
        version: ClientVersion,
        mounted_offset: i8,
    ) -> bool {
        let files = &self.files;
        let bodies = &mut self.bodies;

        let Some(file) = files.get(file_index).and_then(|f| f.as_ref()) else {
            return false;
        };
        let idx_len = file.idx.len();

        let real_type = if version < ClientVersion::V_500A {
            classify_by_graphic(body, file_index)
        } else {
            bodies[index].typ
        };

        let flags = bodies[index].flags;
        let (offset, action_count) = resolve_layout(real_type, flags, body);
        let action_count = action_count.min(MAX_ACTIONS);
        let span = (action_count * MAX_DIRECTIONS) as u64 * ANIM_IDX_RECORD_SIZE;

        if offset < 0 || offset as u64 + span > idx_len {
            return false;
        }
        let Ok(block) = file.idx.read_bytes(offset as u64, span as usize) else {
            return false;
        };

        let target = &mut bodies[index];
        target.graphic = body;
        target.typ = real_type;
        target.file_index = file_index;
        if target.mounted_height_offset == 0 {
            target.mounted_height_offset = mounted_offset;
        }

        let mut reader = SliceReader::new(&block);
        let mut is_valid = false;

        for action in 0..action_count {
            for direction in 0..MAX_DIRECTIONS {
                let Ok(record) = reader.read_record::<AnimIdxRecord>() else {
                    break;
                };
                let (position, size) = (record.position, record.size);
                let slot = &mut target.groups[action].directions[direction];

                if position != SENTINEL && size != SENTINEL {
                    slot.position = position as u64;
                    slot.size = size.max(1);
                    is_valid = true;
                } else {
                    // Nullify stale primary-file data; a converted body may
                    // still miss individual directions.
                    *slot = AnimationDirection::default();
                }
            }
        }

        target.is_valid_mul = is_valid;
        true
    }

    fn grow_to(&mut self, index: usize) {
        while self.bodies.len() <= index {
            let graphic = self.bodies.len() as u16;
            self.bodies.push(BodyIndex::new(graphic));
        }
    }
}
