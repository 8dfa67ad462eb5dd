//! Bitmap font glyph access.
//!
//! `fonts.mul` concatenates ASCII fonts: a header byte, then 224 glyphs
//! (characters 0x20..=0xFF) of `{width: u8, height: u8, pad: u8}` and raw
//! 16-bit pixels. Text layout and rendering live upstream; the core only
//! locates glyphs and turns them into RGBA like any other sprite.

use tracing::debug;

use crate::hues::color16_to_32;
use crate::io::{ByteSource, SliceReader};
use crate::resolve::FileResolver;
use crate::sprite::DecodedFrame;
use crate::util::Result;

const GLYPHS_PER_FONT: usize = 224;

#[derive(Debug, Clone, Copy, Default)]
struct Glyph {
    width: u8,
    height: u8,
    offset: usize,
}

/// The ASCII bitmap font table.
#[derive(Default)]
pub struct FontsLoader {
    data: Vec<u8>,
    fonts: Vec<[Glyph; GLYPHS_PER_FONT]>,
}

impl FontsLoader {
    /// Load and index `fonts.mul`.
    pub fn load(resolver: &FileResolver) -> Result<Self> {
        let source = ByteSource::open(resolver.resolve("fonts.mul"))?;
        let data = source.read_bytes(0, source.len() as usize)?;
        let fonts = index_fonts(&data);

        debug!(fonts = fonts.len(), "fonts loaded");

        Ok(Self { data, fonts })
    }

    /// Build a loader over raw font bytes (tests).
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let fonts = index_fonts(&data);
        Self { data, fonts }
    }

    /// Number of complete fonts in the file.
    #[inline]
    pub fn count(&self) -> usize {
        self.fonts.len()
    }

    /// Width/height of one glyph.
    pub fn glyph_size(&self, font: usize, ch: u8) -> Option<(u8, u8)> {
        let glyph = self.glyph(font, ch)?;
        Some((glyph.width, glyph.height))
    }

    /// Decode one glyph to RGBA; unknown fonts or characters are empty.
    pub fn glyph_pixels(&self, font: usize, ch: u8) -> DecodedFrame {
        let Some(glyph) = self.glyph(font, ch) else {
            return DecodedFrame::empty();
        };
        if glyph.width == 0 || glyph.height == 0 {
            return DecodedFrame::empty();
        }

        let count = glyph.width as usize * glyph.height as usize;
        let mut reader = SliceReader::new(&self.data);
        reader.seek(glyph.offset);

        let mut frame = DecodedFrame {
            width: glyph.width as i16,
            height: glyph.height as i16,
            center_x: 0,
            center_y: 0,
            pixels: vec![0u32; count],
        };

        for pixel in frame.pixels.iter_mut() {
            let Ok(color) = reader.read_u16() else {
                return DecodedFrame::empty();
            };
            if color != 0 {
                *pixel = color16_to_32(color) | 0xFF_00_00_00;
            }
        }

        frame
    }

    fn glyph(&self, font: usize, ch: u8) -> Option<Glyph> {
        let slot = (ch as usize).checked_sub(0x20)?;
        self.fonts.get(font)?.get(slot).copied()
    }
}

/// Walk the file, recording glyph extents until a font runs off the end.
fn index_fonts(data: &[u8]) -> Vec<[Glyph; GLYPHS_PER_FONT]> {
    let mut fonts = Vec::new();
    let mut pos = 0usize;

    'outer: while pos + 1 <= data.len() {
        pos += 1; // font header byte
        let mut glyphs = [Glyph::default(); GLYPHS_PER_FONT];

        for glyph in glyphs.iter_mut() {
            if pos + 3 > data.len() {
                break 'outer;
            }
            let width = data[pos];
            let height = data[pos + 1];
            pos += 3;

            let pixel_bytes = width as usize * height as usize * 2;
            if pos + pixel_bytes > data.len() {
                break 'outer;
            }

            *glyph = Glyph {
                width,
                height,
                offset: pos,
            };
            pos += pixel_bytes;
        }

        fonts.push(glyphs);
    }

    fonts
}
