//! Animation resolution and frame decoding over synthetic archives.

mod common;

use std::fs;

use uoarc::anim::{AnimGroupType, AnimationLoader, BodyConvFlags};
use uoarc::resolve::FileResolver;
use uoarc::util::ClientVersion;

const ACTION: u8 = 1;
const BODY: u16 = 400;

/// Build the decompressed frame blob: a 32-byte header, the frame count
/// and header-table offset, 15 header slots (ids 1, 2 and 5 real, the rest
/// zeroed), then one palette+frame image per real id.
///
/// 15 declared frames over 5 directions puts three frames in each
/// direction's window.
fn frame_blob() -> Vec<u8> {
    const HEADER_TABLE_AT: usize = 40;
    const SLOTS: usize = 15;
    const SLOT_SIZE: usize = 16;
    const FRAME_SIZE: usize = 512 + 8 + 4; // palette + dimensions + terminator

    let real_ids: [u16; 3] = [1, 2, 5];
    let frames_at = HEADER_TABLE_AT + SLOTS * SLOT_SIZE;

    let mut blob = vec![0u8; 32];
    blob.extend_from_slice(&(SLOTS as i32).to_le_bytes());
    blob.extend_from_slice(&(HEADER_TABLE_AT as u32).to_le_bytes());
    assert_eq!(blob.len(), HEADER_TABLE_AT);

    for (slot, &frame_id) in real_ids.iter().enumerate() {
        let header_at = HEADER_TABLE_AT + slot * SLOT_SIZE;
        let frame_at = frames_at + slot * FRAME_SIZE;

        blob.extend_from_slice(&(ACTION as u16).to_le_bytes());
        blob.extend_from_slice(&frame_id.to_le_bytes());
        blob.extend_from_slice(&[0u8; 8]);
        blob.extend_from_slice(&((frame_at - header_at) as u32).to_le_bytes());
    }
    blob.resize(frames_at, 0); // remaining slots stay zeroed

    for &frame_id in &real_ids {
        blob.extend_from_slice(&[0u8; 512]); // palette
        blob.extend_from_slice(&0i16.to_le_bytes()); // center x
        blob.extend_from_slice(&(-1i16).to_le_bytes()); // center y
        blob.extend_from_slice(&(frame_id as i16).to_le_bytes()); // width marks the id
        blob.extend_from_slice(&1i16.to_le_bytes());
        blob.extend_from_slice(&0x7FFF_7FFFu32.to_le_bytes());
    }

    blob
}

fn build_loader(dir: &std::path::Path) -> AnimationLoader {
    let blob = frame_blob();
    let packed = common::deflate(&blob);
    common::write_uop(
        &dir.join("AnimationFrame1.uop"),
        &[(
            format!("build/animationlegacyframe/{BODY:06}/{ACTION:02}.bin"),
            packed,
            1,
            blob.len() as u32,
        )],
    );

    // The flag column marks the body as archive-animated.
    fs::write(dir.join("mobtypes.txt"), "400 monster 10000\n").unwrap();

    let resolver = FileResolver::new(dir);
    AnimationLoader::load(&resolver, ClientVersion::V_7000, true, BodyConvFlags::all()).unwrap()
}

#[test]
fn uop_body_resolves_through_archive() {
    let dir = tempfile::tempdir().unwrap();
    let anims = build_loader(dir.path());

    assert_eq!(anims.anim_type(BODY), AnimGroupType::Monster);
    assert!(anims.anim_flags(BODY).uses_uop());

    let resolved = anims.replace_animation_values(BODY, ACTION, 0, false, false, false);
    assert!(resolved.use_uop);
    assert_eq!(resolved.action, ACTION);

    assert!(anims.is_animation_present(BODY, ACTION));
    assert!(!anims.is_animation_present(BODY, ACTION + 1));
}

#[test]
fn frame_gaps_reconstruct_per_direction() {
    let dir = tempfile::tempdir().unwrap();
    let anims = build_loader(dir.path());

    // Direction 0 window holds frame ids 1..=3: two real frames, one gap.
    let set = anims.frames(BODY, ACTION, 0, 0, false, false, false);
    assert!(set.use_uop);
    assert_eq!(set.frames.len(), 3);
    assert_eq!(set.frames[0].width, 1);
    assert_eq!(set.frames[1].width, 2);
    assert!(set.frames[2].is_empty());

    // Direction 1 window holds ids 4..=6: only id 5 exists.
    let set = anims.frames(BODY, ACTION, 1, 0, false, false, false);
    assert_eq!(set.frames.len(), 3);
    assert_eq!(set.frames[0].width, 5);
    assert!(set.frames[1].is_empty());
    assert!(set.frames[2].is_empty());

    // Direction 2 has no frames at all.
    let set = anims.frames(BODY, ACTION, 2, 0, false, false, false);
    assert_eq!(set.frames.len(), 3);
    assert!(set.frames.iter().all(|f| f.is_empty()));

    // Out-of-range directions are empty sets, never a panic.
    assert!(anims.frames(BODY, ACTION, 9, 0, false, false, false).frames.is_empty());
}

#[test]
fn legacy_body_resolves_directions_from_index() {
    let dir = tempfile::tempdir().unwrap();

    // People layout: body 400's block starts at record 35000. One live
    // direction record, everything else sentinel.
    // Data file: the direction block at 512 holds a palette, one frame
    // offset and a 2x1 frame.
    let mut block = Vec::new();
    block.extend_from_slice(&[0u8; 512]); // palette
    block.extend_from_slice(&1u32.to_le_bytes()); // frame count
    block.extend_from_slice(&8u32.to_le_bytes()); // offset from the count
    block.extend_from_slice(&0i16.to_le_bytes());
    block.extend_from_slice(&(-1i16).to_le_bytes());
    block.extend_from_slice(&2i16.to_le_bytes());
    block.extend_from_slice(&1i16.to_le_bytes());
    block.extend_from_slice(&0x7FFF_7FFFu32.to_le_bytes());

    let base = 35000usize * 12;
    let span = 35 * 5 * 12;
    let mut idx = vec![0xFFu8; base + span];
    idx[base..base + 4].copy_from_slice(&512u32.to_le_bytes());
    idx[base + 4..base + 8].copy_from_slice(&(block.len() as u32).to_le_bytes());
    idx[base + 8..base + 12].copy_from_slice(&0u32.to_le_bytes());
    fs::write(dir.path().join("anim.idx"), &idx).unwrap();

    let mut data = vec![0u8; 512];
    data.extend_from_slice(&block);
    fs::write(dir.path().join("anim.mul"), &data).unwrap();

    let resolver = FileResolver::new(dir.path());
    let anims =
        AnimationLoader::load(&resolver, ClientVersion::V_7000, false, BodyConvFlags::all())
            .unwrap();

    // No mobtypes entry: graphic 400 classifies as Human, People layout.
    assert_eq!(anims.anim_type(BODY), AnimGroupType::Human);
    let body = anims.body(BODY).unwrap();
    assert!(body.is_valid_mul);

    let set = anims.frames(BODY, 0, 0, 0, false, false, false);
    assert!(!set.use_uop);
    assert_eq!(set.frames.len(), 1);
    assert_eq!((set.frames[0].width, set.frames[0].height), (2, 1));

    // The sentinel directions render as empty sets.
    assert!(anims.frames(BODY, 0, 1, 0, false, false, false).frames.is_empty());
}
