//! Animation frame decoding.
//!
//! Legacy frames live as a palette + frame-offset table directly inside the
//! data file at the direction's recorded position. Archive frames live
//! behind the decompression pipeline and interleave every direction of an
//! action into one blob of frame headers; frame ids are 1-based and keep
//! counting across directions, and individual frames may be missing, so the
//! requested direction is reconstructed by bucketing sorted frame ids and
//! padding the gaps with empty frames.

use tracing::warn;

use crate::io::{decompress, SliceReader};
use crate::sprite::{self, DecodedFrame};

use super::resolver::AnimationLoader;
use super::{AnimGroupType, MAX_ACTIONS, MAX_DIRECTIONS};

/// Frames per direction when the classification pins them (equipment and
/// human bodies in the archives).
const EQUIPMENT_FRAMES_PER_DIRECTION: usize = 10;

/// Archive frame header: `{group, frame_id, 4 pad words, data_offset}`.
const UOP_FRAME_HEADER_SIZE: usize = 16;

/// One resolved animation query.
#[derive(Debug, Default)]
pub struct FrameSet {
    pub frames: Vec<DecodedFrame>,
    pub hue: u16,
    pub use_uop: bool,
}

impl AnimationLoader {
    /// Decode every frame of one (body, action, direction) query.
    ///
    /// All remapping (body/corpse aliases, equipment preference, replaced
    /// archive actions) happens here; failures and missing data come back
    /// as an empty set.
    pub fn frames(
        &self,
        graphic: u16,
        action: u8,
        direction: u8,
        hue: u16,
        is_equip: bool,
        is_corpse: bool,
        force_uop: bool,
    ) -> FrameSet {
        if action as usize >= MAX_ACTIONS || direction as usize >= MAX_DIRECTIONS {
            return FrameSet::default();
        }

        let resolved =
            self.replace_animation_values(graphic, action, hue, is_equip, is_corpse, force_uop);

        let mut set = FrameSet {
            frames: Vec::new(),
            hue: resolved.hue,
            use_uop: resolved.use_uop,
        };

        let Some(body) = self.body(resolved.graphic) else {
            return set;
        };

        set.frames = if resolved.use_uop {
            self.read_uop_frames(resolved.graphic, resolved.action, direction, body.typ)
        } else {
            self.read_mul_frames(resolved.graphic, resolved.action, direction)
        };

        set
    }

    fn read_mul_frames(&self, graphic: u16, action: u8, direction: u8) -> Vec<DecodedFrame> {
        let Some(body) = self.body(graphic) else {
            return Vec::new();
        };
        let Some(dir) = body.direction(action, direction) else {
            return Vec::new();
        };
        if dir.is_absent() {
            return Vec::new();
        }
        let Some(file) = self.legacy_file(body.file_index) else {
            return Vec::new();
        };
        let Ok(bytes) = file.data.slice(dir.position, dir.size as usize) else {
            return Vec::new();
        };

        let mut reader = SliceReader::new(bytes);
        let Some(palette) = sprite::read_palette(&mut reader) else {
            return Vec::new();
        };

        // Frame offsets are relative to the position of the count itself.
        let data_start = reader.position();
        let Ok(frame_count) = reader.read_u32() else {
            return Vec::new();
        };

        let mut offsets = Vec::with_capacity(frame_count as usize);
        for _ in 0..frame_count {
            match reader.read_u32() {
                Ok(offset) => offsets.push(offset),
                Err(_) => return Vec::new(),
            }
        }

        let mut frames = Vec::with_capacity(offsets.len());
        for offset in offsets {
            let mut frame_reader = SliceReader::new(bytes);
            frame_reader.seek(data_start + offset as usize);
            frames.push(sprite::decode_anim_frame(
                &mut frame_reader,
                &palette,
                false,
            ));
        }

        frames
    }

    fn read_uop_frames(
        &self,
        graphic: u16,
        action: u8,
        direction: u8,
        typ: AnimGroupType,
    ) -> Vec<DecodedFrame> {
        let Some(body) = self.body(graphic) else {
            return Vec::new();
        };
        let Some(slot) = body.uop_direct(action) else {
            return Vec::new();
        };
        if slot.is_absent() {
            return Vec::new();
        }
        let Some(archive) = self.uop_archive(slot.file_index) else {
            return Vec::new();
        };
        let Ok(raw) = archive
            .data()
            .slice(slot.data.position, slot.data.size as usize)
        else {
            return Vec::new();
        };

        let bytes = match decompress(
            slot.data.compression,
            raw,
            slot.data.uncompressed_size as usize,
        ) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(graphic, action, error = %e, "animation blob failed to decompress");
                return Vec::new();
            }
        };

        let mut reader = SliceReader::new(&bytes);
        reader.skip(32);
        let Ok(frame_count) = reader.read_i32() else {
            return Vec::new();
        };
        let Ok(data_start) = reader.read_u32() else {
            return Vec::new();
        };
        reader.seek(data_start as usize);

        // Collect (frame id, pixel offset) for this action's headers.
        let mut collected: Vec<(u16, usize)> = Vec::with_capacity(frame_count.max(0) as usize);
        for _ in 0..frame_count.max(0) {
            let header_at = reader.position();
            let Ok(group) = reader.read_u16() else { break };
            let Ok(frame_id) = reader.read_u16() else {
                break;
            };
            reader.skip(8);
            let Ok(data_offset) = reader.read_u32() else {
                break;
            };
            reader.seek(header_at + UOP_FRAME_HEADER_SIZE);

            if group != action as u16 || frame_id == 0 {
                continue;
            }
            collected.push((frame_id, header_at + data_offset as usize));
        }

        collected.sort_by_key(|&(frame_id, _)| frame_id);

        let frames_per_direction = if typ < AnimGroupType::Equipment {
            ((frame_count.max(0) as f64 / MAX_DIRECTIONS as f64).round() as usize).max(1)
        } else {
            EQUIPMENT_FRAMES_PER_DIRECTION
        };

        // Frame ids are 1-based and run consecutively across directions;
        // bucket them and take only the requested direction's, in order.
        let mut frames = Vec::with_capacity(frames_per_direction);
        for &(frame_id, pixel_at) in &collected {
            if (frame_id as usize - 1) / frames_per_direction != direction as usize {
                continue;
            }
            if frames.len() == frames_per_direction {
                break;
            }

            let mut frame_reader = SliceReader::new(&bytes);
            frame_reader.seek(pixel_at);
            let Some(palette) = sprite::read_palette(&mut frame_reader) else {
                frames.push(DecodedFrame::empty());
                continue;
            };
            frames.push(sprite::decode_anim_frame(&mut frame_reader, &palette, true));
        }

        // Missing trailing frames stay addressable as gaps.
        while frames.len() < frames_per_direction {
            frames.push(DecodedFrame::empty());
        }

        frames
    }
}
