//! Geometry, color and vertex types shared by the command buffer and its
//! consumers.
//!
//! All vertex and record types are `#[repr(C)]` and [`Pod`], so they can be
//! serialized into the command arena and uploaded to the GPU as raw bytes.

use bytemuck::{Pod, Zeroable};

/// A 2D point or extent in pixels, or a UV coordinate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl Vec2 {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Build a vector from its components.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A floating-point RGBA color in `[0, 1]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Rgba {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Rgba {
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Build a color from its channels.
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Channels as an array, in `r, g, b, a` order.
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// An RGBA8 color packed into a `u32`, red in the low byte.
///
/// In memory (little-endian) the bytes read `r, g, b, a`, which is the
/// layout the vertex shaders consume as a normalized `vec4`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Color(pub u32);

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);

    /// An opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xff)
    }

    /// A color with explicit alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(r as u32 | (g as u32) << 8 | (b as u32) << 16 | (a as u32) << 24)
    }

    /// Individual channels, in `r, g, b, a` order.
    #[must_use]
    pub const fn channels(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Unpack into floating-point channels.
    #[must_use]
    pub fn to_rgba(self) -> Rgba {
        let [r, g, b, a] = self.channels();
        Rgba::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }
}

/// An untextured vertex: position plus packed color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Position in pixels, origin top-left.
    pub pos: Vec2,
    /// Vertex color.
    pub color: Color,
}

/// A textured vertex: position plus texture coordinate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct TexturedVertex {
    /// Position in pixels, origin top-left.
    pub pos: Vec2,
    /// Texture coordinate in `[0, 1]`.
    pub uv: Vec2,
}

/// Identifies a texture owned by a backend.
///
/// Id `0` is never handed out by a backend, so it can serve as the empty
/// key in a [`U64Map`](crate::map::U64Map).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct TextureId(u32);

impl TextureId {
    /// Wrap a raw texture id.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_packs_red_in_low_byte() {
        let c = Color::rgb(0x02, 0x6a, 0xa7);
        assert_eq!(c.0, 0xffa7_6a02);
        assert_eq!(c.channels(), [0x02, 0x6a, 0xa7, 0xff]);
    }

    #[test]
    fn color_unpacks_to_unit_floats() {
        let c = Color::rgba(255, 0, 51, 0).to_rgba();
        assert!((c.r - 1.0).abs() < f32::EPSILON);
        assert!(c.g.abs() < f32::EPSILON);
        assert!((c.b - 0.2).abs() < 1e-6);
        assert!(c.a.abs() < f32::EPSILON);
    }

    #[test]
    fn rgba_array_is_channel_ordered() {
        assert_eq!(Rgba::new(0.1, 0.2, 0.3, 0.4).to_array(), [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(Color::WHITE.to_rgba().to_array(), [1.0; 4]);
    }

    #[test]
    fn vertex_layouts() {
        assert_eq!(std::mem::size_of::<Vertex>(), 12);
        assert_eq!(std::mem::size_of::<TexturedVertex>(), 16);
    }
}
