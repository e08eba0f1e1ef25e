//! Packed glyph tables supplied by the font asset pipeline.
//!
//! A [`Font`] pairs an atlas texture with a table of [`PackedChar`]s, one per
//! codepoint in a contiguous range. Rasterizing and packing the atlas happens
//! offline; this module only lays glyphs out from the packed metrics.
//! There is no shaping: one codepoint produces one quad.

use crate::types::{TextureId, Vec2};

/// Placement of one glyph in the atlas plus its layout metrics.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PackedChar {
    /// Left edge in the atlas, in texels.
    pub x0: u16,
    /// Top edge in the atlas, in texels.
    pub y0: u16,
    /// Right edge in the atlas, in texels.
    pub x1: u16,
    /// Bottom edge in the atlas, in texels.
    pub y1: u16,
    /// Offset from the pen position to the quad's left edge.
    pub xoff: f32,
    /// Offset from the baseline to the quad's top edge.
    pub yoff: f32,
    /// Horizontal pen advance after this glyph.
    pub xadvance: f32,
    /// Offset from the pen position to the quad's right edge.
    pub xoff2: f32,
    /// Offset from the baseline to the quad's bottom edge.
    pub yoff2: f32,
}

/// Screen rectangle and atlas UV rectangle of one laid-out glyph.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AlignedQuad {
    /// Top-left corner in pixels.
    pub pos0: Vec2,
    /// Bottom-right corner in pixels.
    pub pos1: Vec2,
    /// UV of the top-left corner.
    pub uv0: Vec2,
    /// UV of the bottom-right corner.
    pub uv1: Vec2,
}

/// A font atlas and its packed glyph table.
#[derive(Clone, Debug)]
pub struct Font {
    texture: TextureId,
    atlas_size: [u32; 2],
    first_char: u32,
    chars: Vec<PackedChar>,
    fallback: usize,
}

impl Font {
    /// Codepoint of the first entry in a conventional ASCII table.
    pub const FIRST_PRINTABLE: u32 = 32;

    /// Build a font whose `chars[i]` describes codepoint `first_char + i`.
    ///
    /// Codepoints outside the table render with the `?` glyph when the table
    /// has one, and with its first entry otherwise.
    ///
    /// # Panics
    ///
    /// Panics if `chars` is empty or an atlas dimension is zero.
    #[must_use]
    pub fn new(
        texture: TextureId,
        atlas_size: [u32; 2],
        first_char: u32,
        chars: Vec<PackedChar>,
    ) -> Self {
        assert!(!chars.is_empty(), "font needs at least one glyph");
        assert!(
            atlas_size[0] > 0 && atlas_size[1] > 0,
            "font atlas must not be empty"
        );
        let fallback = u32::from('?')
            .checked_sub(first_char)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i < chars.len())
            .unwrap_or(0);
        Self {
            texture,
            atlas_size,
            first_char,
            chars,
            fallback,
        }
    }

    /// Atlas texture the glyph UVs refer to.
    #[must_use]
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Packed entry for `ch`, or the fallback entry.
    #[must_use]
    pub fn glyph(&self, ch: char) -> &PackedChar {
        let index = u32::from(ch)
            .checked_sub(self.first_char)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i < self.chars.len())
            .unwrap_or(self.fallback);
        &self.chars[index]
    }

    /// Lay out `ch` at the pen position `pen` (on the baseline) and advance
    /// the pen past it.
    #[allow(clippy::cast_precision_loss)]
    pub fn packed_quad(&self, ch: char, pen: &mut Vec2) -> AlignedQuad {
        let glyph = self.glyph(ch);
        let inv_w = 1.0 / self.atlas_size[0] as f32;
        let inv_h = 1.0 / self.atlas_size[1] as f32;

        let quad = AlignedQuad {
            pos0: Vec2::new(pen.x + glyph.xoff, pen.y + glyph.yoff),
            pos1: Vec2::new(pen.x + glyph.xoff2, pen.y + glyph.yoff2),
            uv0: Vec2::new(f32::from(glyph.x0) * inv_w, f32::from(glyph.y0) * inv_h),
            uv1: Vec2::new(f32::from(glyph.x1) * inv_w, f32::from(glyph.y1) * inv_h),
        };
        pen.x += glyph.xadvance;
        quad
    }

    /// Total pen advance of `text` on one line.
    #[must_use]
    pub fn advance(&self, text: &str) -> f32 {
        text.chars().map(|ch| self.glyph(ch).xadvance).sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A monospace test font: every glyph is 8x12 pixels, advances 8, and
    /// sits in column `i` of a 1024x16 atlas.
    pub(crate) fn mono_font(texture: TextureId) -> Font {
        let chars = (0..95u16)
            .map(|i| PackedChar {
                x0: i * 8,
                y0: 0,
                x1: i * 8 + 8,
                y1: 12,
                xoff: 0.0,
                yoff: -10.0,
                xadvance: 8.0,
                xoff2: 8.0,
                yoff2: 2.0,
            })
            .collect();
        Font::new(texture, [1024, 16], Font::FIRST_PRINTABLE, chars)
    }

    #[test]
    fn packed_quad_places_and_advances() {
        let font = mono_font(TextureId::new(1));
        let mut pen = Vec2::new(10.0, 20.0);
        let q = font.packed_quad('!', &mut pen);
        assert_eq!(q.pos0, Vec2::new(10.0, 10.0));
        assert_eq!(q.pos1, Vec2::new(18.0, 22.0));
        assert_eq!(q.uv0, Vec2::new(8.0 / 1024.0, 0.0));
        assert_eq!(q.uv1, Vec2::new(16.0 / 1024.0, 12.0 / 16.0));
        assert_eq!(pen, Vec2::new(18.0, 20.0));
    }

    #[test]
    fn out_of_range_uses_question_mark() {
        let font = mono_font(TextureId::new(1));
        assert_eq!(font.glyph('é'), font.glyph('?'));
        assert_eq!(font.glyph('\n'), font.glyph('?'));
    }

    #[test]
    fn advance_sums_glyphs() {
        let font = mono_font(TextureId::new(1));
        assert!((font.advance("abc") - 24.0).abs() < f32::EPSILON);
    }
}
