//! Hue tables and 16-to-32-bit color conversion.
//!
//! `hues.mul` is an array of groups, each a header word plus eight 32-color
//! ramps with their blend range and name. The table is a verdata patch
//! target (subsystem 32): a patch replaces a whole group's header and color
//! ramps in place. `radarcol.mul` rides along here as the flat 16-bit radar
//! color table.

use std::path::Path;

use crate::io::{ByteSource, SliceReader};
use crate::util::Result;

/// One 32-color hue ramp.
#[derive(Debug, Clone, Default)]
pub struct HueRamp {
    pub colors: [u16; 32],
    pub table_start: u16,
    pub table_end: u16,
    pub name: String,
}

/// A group of eight ramps, the unit hues.mul is laid out in.
#[derive(Debug, Clone, Default)]
pub struct HueGroup {
    pub header: u32,
    pub ramps: [HueRamp; 8],
}

/// On-disk size of one ramp: 32 colors + start + end + 20-byte name.
const RAMP_SIZE: usize = 32 * 2 + 2 + 2 + 20;
/// On-disk size of one group.
pub const GROUP_SIZE: usize = 4 + 8 * RAMP_SIZE;

/// The loaded hue table.
#[derive(Default)]
pub struct HuesTable {
    groups: Vec<HueGroup>,
    shadow: Vec<HueGroup>,
    radar_colors: Vec<u16>,
}

impl HuesTable {
    /// Load `hues.mul` and, when present, `radarcol.mul`.
    pub fn load(hues_path: impl AsRef<Path>, radarcol_path: Option<&Path>) -> Result<Self> {
        let source = ByteSource::open(hues_path)?;
        let group_count = (source.len() / GROUP_SIZE as u64) as usize;
        let bytes = source.read_bytes(0, group_count * GROUP_SIZE)?;
        let mut reader = SliceReader::new(&bytes);

        let mut groups = Vec::with_capacity(group_count);
        for _ in 0..group_count {
            groups.push(read_group(&mut reader)?);
        }

        let radar_colors = match radarcol_path {
            Some(path) => match ByteSource::open(path) {
                Ok(radar) => {
                    let count = (radar.len() / 2) as usize;
                    let bytes = radar.read_bytes(0, count * 2)?;
                    let mut r = SliceReader::new(&bytes);
                    (0..count).map(|_| r.read_u16()).collect::<Result<_>>()?
                }
                Err(_) => Vec::new(),
            },
            None => Vec::new(),
        };

        let shadow = groups.clone();

        Ok(Self {
            groups,
            shadow,
            radar_colors,
        })
    }

    /// Number of individual hues (eight per group).
    #[inline]
    pub fn hue_count(&self) -> usize {
        self.groups.len() * 8
    }

    #[inline]
    pub fn groups(&self) -> &[HueGroup] {
        &self.groups
    }

    #[inline]
    pub fn radar_colors(&self) -> &[u16] {
        &self.radar_colors
    }

    /// Look up one ramp by hue id (1-based, as wire protocols send them).
    pub fn ramp(&self, hue: u16) -> Option<&HueRamp> {
        let index = (hue as usize).checked_sub(1)?;
        self.groups.get(index / 8).map(|g| &g.ramps[index % 8])
    }

    /// Replace a group's header and ramp colors from a verdata payload.
    ///
    /// The patch record carries a full group image; blend ranges and names
    /// keep their loaded values.
    pub fn patch_group(&mut self, index: usize, payload: &[u8]) -> bool {
        let Some(group) = self.groups.get_mut(index) else {
            return false;
        };

        let mut reader = SliceReader::new(payload);
        let Ok(header) = reader.read_u32() else {
            return false;
        };

        let mut ramps = [[0u16; 32]; 8];
        for ramp in ramps.iter_mut() {
            for color in ramp.iter_mut() {
                let Ok(v) = reader.read_u16() else {
                    return false;
                };
                *color = v;
            }
        }

        group.header = header;
        for (ramp, colors) in group.ramps.iter_mut().zip(ramps) {
            ramp.colors = colors;
        }
        true
    }

    /// Restore every group to its pre-patch state.
    pub fn reset_patches(&mut self) {
        self.groups.clone_from(&self.shadow);
    }
}

fn read_group(reader: &mut SliceReader) -> Result<HueGroup> {
    let header = reader.read_u32()?;
    let mut group = HueGroup {
        header,
        ..HueGroup::default()
    };

    for ramp in group.ramps.iter_mut() {
        for color in ramp.colors.iter_mut() {
            *color = reader.read_u16()?;
        }
        ramp.table_start = reader.read_u16()?;
        ramp.table_end = reader.read_u16()?;
        ramp.name = reader.read_ascii(20)?;
    }

    Ok(group)
}

/// Expand a 5-bit channel to 8 bits.
const fn channel(v: u16) -> u32 {
    let v = (v & 0x1F) as u32;
    (v << 3) | (v >> 2)
}

/// Convert an ARGB1555 color to packed RGBA (alpha left clear).
#[inline]
pub const fn color16_to_32(c: u16) -> u32 {
    channel(c >> 10) | (channel(c >> 5) << 8) | (channel(c) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn color_expansion() {
        assert_eq!(color16_to_32(0), 0);
        // Full white: all channels saturate to 0xFF.
        assert_eq!(color16_to_32(0x7FFF), 0x00FF_FFFF);
        // Pure 5-bit red lands in the low byte.
        assert_eq!(color16_to_32(0x7C00) & 0xFF, 0xFF);
        assert_eq!(color16_to_32(0x7C00) & 0x00FF_FF00, 0);
    }

    fn write_hues(groups: usize) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for g in 0..groups {
            f.write_all(&(g as u32).to_le_bytes()).unwrap();
            for ramp in 0..8u16 {
                for c in 0..32u16 {
                    f.write_all(&(ramp * 32 + c).to_le_bytes()).unwrap();
                }
                f.write_all(&0u16.to_le_bytes()).unwrap();
                f.write_all(&31u16.to_le_bytes()).unwrap();
                f.write_all(&[0u8; 20]).unwrap();
            }
        }
        f.flush().unwrap();
        f
    }

    #[test]
    fn loads_groups() {
        let file = write_hues(3);
        let hues = HuesTable::load(file.path(), None).unwrap();
        assert_eq!(hues.hue_count(), 24);
        assert_eq!(hues.groups()[1].header, 1);

        // Hue ids are 1-based: hue 1 is the first ramp of group 0.
        let ramp = hues.ramp(1).unwrap();
        assert_eq!(ramp.colors[0], 0);
        let ramp = hues.ramp(9).unwrap();
        assert_eq!(ramp.colors[0], 0);
        assert!(hues.ramp(0).is_none());
        assert!(hues.ramp(999).is_none());
    }

    #[test]
    fn patch_and_reset() {
        let file = write_hues(2);
        let mut hues = HuesTable::load(file.path(), None).unwrap();

        let mut payload = Vec::new();
        payload.extend_from_slice(&0xDEADu32.to_le_bytes());
        for _ in 0..8 * 32 {
            payload.extend_from_slice(&0x7FFFu16.to_le_bytes());
        }

        assert!(hues.patch_group(1, &payload));
        assert_eq!(hues.groups()[1].header, 0xDEAD);
        assert_eq!(hues.groups()[1].ramps[0].colors[0], 0x7FFF);
        // Blend range survives the patch.
        assert_eq!(hues.groups()[1].ramps[0].table_end, 31);

        hues.reset_patches();
        assert_eq!(hues.groups()[1].header, 1);
        assert_eq!(hues.groups()[1].ramps[0].colors[0], 0);

        // Truncated payloads leave the group untouched.
        assert!(!hues.patch_group(0, &payload[..10]));
        assert_eq!(hues.groups()[0].header, 0);
    }
}
