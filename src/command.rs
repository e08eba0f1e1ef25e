//! The deferred render-command buffer.
//!
//! Drawing code appends type-tagged records to a fixed-size byte arena while
//! writing geometry into two vertex pools, one for untextured quads and one
//! for textured quads and glyphs. Once per frame a backend walks the arena
//! front to back through [`FrameView::entries`] and issues one draw call per
//! record.
//!
//! # Record layout
//!
//! Every record is a [`RecordHeader`] followed by the payload for its tag:
//!
//! | Tag                      | Payload                  |
//! |--------------------------|--------------------------|
//! | [`CommandTag::Clear`]         | [`ClearRecord`]          |
//! | [`CommandTag::Quads`]         | [`QuadsRecord`]          |
//! | [`CommandTag::TexturedQuads`] | [`TexturedQuadsRecord`]  |
//!
//! Payload sizes are fixed per tag, so the arena needs no separate index.
//! Records are stored unaligned.
//!
//! # Batching
//!
//! At most one `Quads` and one `TexturedQuads` record are open at a time.
//! A rect extends the open `Quads` record when its [`QuadKind`] matches;
//! a textured rect or text run extends the open `TexturedQuads` record when
//! its tint color matches. Any new record closes both open batches.
//!
//! # Capacity
//!
//! Running out of arena space panics: the arena is sized once for the worst
//! frame, so overflow is a configuration bug. Running out of vertex space
//! drops the single draw request that did not fit.

use std::mem;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::error::DecodeError;
use crate::font::Font;
use crate::types::{Color, Rgba, TextureId, TexturedVertex, Vec2, Vertex};

/// Vertices emitted per quad (two triangles).
pub const VERTS_PER_QUAD: usize = 6;

/// Tag identifying the payload that follows a [`RecordHeader`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CommandTag {
    /// Clear the target to a color.
    Clear = 0,
    /// A batch of untextured quads.
    Quads = 1,
    /// A batch of textured quads.
    TexturedQuads = 2,
}

impl CommandTag {
    /// Size in bytes of the payload that follows a header with this tag.
    #[must_use]
    pub const fn payload_size(self) -> usize {
        match self {
            Self::Clear => mem::size_of::<ClearRecord>(),
            Self::Quads => mem::size_of::<QuadsRecord>(),
            Self::TexturedQuads => mem::size_of::<TexturedQuadsRecord>(),
        }
    }
}

impl TryFrom<u32> for CommandTag {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, u32> {
        match value {
            0 => Ok(Self::Clear),
            1 => Ok(Self::Quads),
            2 => Ok(Self::TexturedQuads),
            other => Err(other),
        }
    }
}

/// How the fragment stage fills an untextured quad.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum QuadKind {
    /// Solid fill.
    Normal = 0,
    /// Dashed diagonal fill.
    Dashed = 1,
    /// Filled circle inscribed in the quad.
    Circle = 2,
}

impl TryFrom<u32> for QuadKind {
    type Error = DecodeError;

    fn try_from(value: u32) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Dashed),
            2 => Ok(Self::Circle),
            other => Err(DecodeError::UnknownQuadKind(other)),
        }
    }
}

/// Fixed header at the start of every record.
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct RecordHeader {
    /// A [`CommandTag`] discriminant.
    pub tag: u32,
}

/// Payload of a [`CommandTag::Clear`] record.
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct ClearRecord {
    /// Color the target is cleared to.
    pub color: Rgba,
}

/// Payload of a [`CommandTag::Quads`] record.
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct QuadsRecord {
    /// Number of quads in the batch.
    pub count: u32,
    /// First vertex in the untextured pool.
    pub vertex_index: u32,
    /// A [`QuadKind`] discriminant.
    pub kind: u32,
}

/// Payload of a [`CommandTag::TexturedQuads`] record.
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct TexturedQuadsRecord {
    /// Number of quads in the batch.
    pub count: u32,
    /// First vertex in the textured pool.
    pub vertex_index: u32,
    /// Tint color; the batch key.
    pub color: Color,
    /// Texture bound when drawing this batch.
    pub texture: TextureId,
}

const HEADER_SIZE: usize = mem::size_of::<RecordHeader>();

/// Per-frame render target description, fixed for the frame.
#[derive(Copy, Clone, Debug, Default)]
pub struct RenderSettings<'a> {
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Font for headings.
    pub header_font: Option<&'a Font>,
    /// Font for body text.
    pub text_font: Option<&'a Font>,
}

impl<'a> RenderSettings<'a> {
    /// Settings for a `width` x `height` viewport without fonts.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            header_font: None,
            text_font: None,
        }
    }

    /// Attach the heading and body fonts.
    #[must_use]
    pub fn with_fonts(mut self, header_font: &'a Font, text_font: &'a Font) -> Self {
        self.header_font = Some(header_font);
        self.text_font = Some(text_font);
        self
    }
}

/// The command arena and vertex pools for one frame, plus the push API.
///
/// All three spans are borrowed from the frame driver, which owns them for
/// the life of the program. Cursors only move forward until
/// [`reset`](Self::reset).
#[derive(Debug)]
pub struct RenderCommands<'a> {
    settings: RenderSettings<'a>,

    arena: &'a mut [u8],
    cursor: usize,

    vertices: &'a mut [Vertex],
    vertex_count: usize,

    textured: &'a mut [TexturedVertex],
    textured_count: usize,

    /// Payload offset of the open `Quads` record.
    current_quads: Option<usize>,
    /// Payload offset of the open `TexturedQuads` record.
    current_textured: Option<usize>,
}

impl<'a> RenderCommands<'a> {
    /// Wrap the frame's backing spans with all cursors at zero.
    ///
    /// # Panics
    ///
    /// Panics if either vertex pool holds more than `u32::MAX` vertices,
    /// since records address vertices with `u32`.
    pub fn new(
        arena: &'a mut [u8],
        vertices: &'a mut [Vertex],
        textured: &'a mut [TexturedVertex],
        settings: RenderSettings<'a>,
    ) -> Self {
        assert!(
            u32::try_from(vertices.len()).is_ok() && u32::try_from(textured.len()).is_ok(),
            "vertex pools are addressed with u32 indices"
        );
        Self {
            settings,
            arena,
            cursor: 0,
            vertices,
            vertex_count: 0,
            textured,
            textured_count: 0,
            current_quads: None,
            current_textured: None,
        }
    }

    /// The frame's render settings.
    #[must_use]
    pub fn settings(&self) -> &RenderSettings<'a> {
        &self.settings
    }

    /// Bytes of the arena written so far.
    #[must_use]
    pub fn command_bytes(&self) -> usize {
        self.cursor
    }

    /// Untextured vertices written so far.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Textured vertices written so far.
    #[must_use]
    pub fn textured_vertex_count(&self) -> usize {
        self.textured_count
    }

    /// Rewind every cursor and close both batches.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.vertex_count = 0;
        self.textured_count = 0;
        self.current_quads = None;
        self.current_textured = None;
    }

    /// Read-only view of everything written so far.
    #[must_use]
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            commands: &self.arena[..self.cursor],
            vertices: &self.vertices[..self.vertex_count],
            textured: &self.textured[..self.textured_count],
            width: self.settings.width,
            height: self.settings.height,
        }
    }

    /// Append a record and return its payload offset. Closes both batches.
    fn push_record<T: Pod>(&mut self, tag: CommandTag, payload: T) -> usize {
        let size = HEADER_SIZE + mem::size_of::<T>();
        let end = self.cursor + size;
        if end > self.arena.len() {
            panic!(
                "render command buffer is full: {} of {} bytes used, {size} more requested",
                self.cursor,
                self.arena.len()
            );
        }

        let header = RecordHeader { tag: tag as u32 };
        let payload_offset = self.cursor + HEADER_SIZE;
        self.arena[self.cursor..payload_offset].copy_from_slice(bytemuck::bytes_of(&header));
        self.arena[payload_offset..end].copy_from_slice(bytemuck::bytes_of(&payload));
        self.cursor = end;

        self.current_quads = None;
        self.current_textured = None;
        payload_offset
    }

    fn read_payload<T: Pod>(&self, offset: usize) -> T {
        bytemuck::pod_read_unaligned(&self.arena[offset..offset + mem::size_of::<T>()])
    }

    fn write_payload<T: Pod>(&mut self, offset: usize, payload: &T) {
        self.arena[offset..offset + mem::size_of::<T>()]
            .copy_from_slice(bytemuck::bytes_of(payload));
    }

    /// Clear the target to `color`. Always a standalone record.
    pub fn push_clear(&mut self, color: Rgba) {
        self.push_record(CommandTag::Clear, ClearRecord { color });
    }

    /// Payload offset of a `Quads` record of `kind` that can take
    /// `quad_count` more quads, opening one if needed. `None` if the
    /// untextured pool cannot fit them.
    #[allow(clippy::cast_possible_truncation)]
    fn quads(&mut self, kind: QuadKind, quad_count: usize) -> Option<usize> {
        if self.vertex_count + quad_count * VERTS_PER_QUAD > self.vertices.len() {
            tracing::trace!(
                vertex_count = self.vertex_count,
                capacity = self.vertices.len(),
                "vertex pool full, dropping quad"
            );
            return None;
        }

        if let Some(offset) = self.current_quads {
            if self.read_payload::<QuadsRecord>(offset).kind == kind as u32 {
                return Some(offset);
            }
        }

        // Pool length fits in u32 (checked in `new`).
        let offset = self.push_record(
            CommandTag::Quads,
            QuadsRecord {
                count: 0,
                vertex_index: self.vertex_count as u32,
                kind: kind as u32,
            },
        );
        self.current_quads = Some(offset);
        Some(offset)
    }

    /// Payload offset of a `TexturedQuads` record tinted `color` that can
    /// take `quad_count` more quads, opening one bound to `texture` if
    /// needed. `None` if the textured pool cannot fit them.
    ///
    /// Only the tint is compared: a run of same-color draws against
    /// different textures stays in the first record and keeps its texture.
    #[allow(clippy::cast_possible_truncation)]
    fn textured_quads(
        &mut self,
        texture: TextureId,
        color: Color,
        quad_count: usize,
    ) -> Option<usize> {
        if self.textured_count + quad_count * VERTS_PER_QUAD > self.textured.len() {
            tracing::trace!(
                vertex_count = self.textured_count,
                capacity = self.textured.len(),
                quads = quad_count,
                "textured vertex pool full, dropping draw"
            );
            return None;
        }

        if let Some(offset) = self.current_textured {
            if self.read_payload::<TexturedQuadsRecord>(offset).color == color {
                return Some(offset);
            }
        }

        let offset = self.push_record(
            CommandTag::TexturedQuads,
            TexturedQuadsRecord {
                count: 0,
                vertex_index: self.textured_count as u32,
                color,
                texture,
            },
        );
        self.current_textured = Some(offset);
        Some(offset)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_quads<T: Pod + CountedRecord>(&mut self, offset: usize, quads: usize) {
        let mut record = self.read_payload::<T>(offset);
        // Bounded by the pool length, which fits in u32.
        *record.count_mut() += quads as u32;
        self.write_payload(offset, &record);
    }

    /// Draw a solid rect with its top-left corner at `pos`.
    ///
    /// Silently dropped when the untextured pool is full.
    pub fn push_rect(&mut self, pos: Vec2, size: Vec2, kind: QuadKind, color: Color) {
        let Some(offset) = self.quads(kind, 1) else {
            return;
        };
        self.add_quads::<QuadsRecord>(offset, 1);

        let [p0, p1, p2, p3] = corners(pos, size);
        let start = self.vertex_count;
        let verts = &mut self.vertices[start..start + VERTS_PER_QUAD];
        for (vert, pos) in verts.iter_mut().zip(quad_order(p0, p1, p2, p3)) {
            *vert = Vertex { pos, color };
        }
        self.vertex_count += VERTS_PER_QUAD;
    }

    /// Draw a textured rect sampling `uv_start..uv_end` of `texture`,
    /// tinted `color`.
    ///
    /// Silently dropped when the textured pool is full.
    pub fn push_textured_rect(
        &mut self,
        pos: Vec2,
        size: Vec2,
        uv_start: Vec2,
        uv_end: Vec2,
        texture: TextureId,
        color: Color,
    ) {
        let Some(offset) = self.textured_quads(texture, color, 1) else {
            return;
        };
        self.add_quads::<TexturedQuadsRecord>(offset, 1);

        let start = self.textured_count;
        write_textured_quad(
            &mut self.textured[start..start + VERTS_PER_QUAD],
            corners(pos, size),
            span(uv_start, uv_end),
        );
        self.textured_count += VERTS_PER_QUAD;
    }

    /// Draw `text` on the baseline starting at `origin`, one quad per
    /// character, tinted `color`.
    ///
    /// `origin` is advanced past the text so calls can be chained. The whole
    /// string is dropped, and `origin` left alone, when the textured pool
    /// cannot fit every glyph.
    pub fn draw_text(&mut self, origin: &mut Vec2, color: Color, font: &Font, text: &str) {
        let glyphs = text.chars().count();
        if glyphs == 0 {
            return;
        }
        let Some(offset) = self.textured_quads(font.texture(), color, glyphs) else {
            return;
        };
        self.add_quads::<TexturedQuadsRecord>(offset, glyphs);

        let start = self.textured_count;
        let verts = &mut self.textured[start..start + glyphs * VERTS_PER_QUAD];
        for (quad_verts, ch) in verts.chunks_exact_mut(VERTS_PER_QUAD).zip(text.chars()) {
            let q = font.packed_quad(ch, origin);
            write_textured_quad(quad_verts, span(q.pos0, q.pos1), span(q.uv0, q.uv1));
        }
        self.textured_count += glyphs * VERTS_PER_QUAD;
    }
}

trait CountedRecord {
    fn count_mut(&mut self) -> &mut u32;
}

impl CountedRecord for QuadsRecord {
    fn count_mut(&mut self) -> &mut u32 {
        &mut self.count
    }
}

impl CountedRecord for TexturedQuadsRecord {
    fn count_mut(&mut self) -> &mut u32 {
        &mut self.count
    }
}

/// Corners of a rect: top-left, bottom-left, top-right, bottom-right.
fn corners(pos: Vec2, size: Vec2) -> [Vec2; 4] {
    span(pos, Vec2::new(pos.x + size.x, pos.y + size.y))
}

/// Corners of the rect from `min` to `max`, in [`corners`] order.
fn span(min: Vec2, max: Vec2) -> [Vec2; 4] {
    [min, Vec2::new(min.x, max.y), Vec2::new(max.x, min.y), max]
}

/// Two triangles from [`corners`] order: TL, BL, TR, TR, BR, BL.
fn quad_order<T: Copy>(tl: T, bl: T, tr: T, br: T) -> [T; VERTS_PER_QUAD] {
    [tl, bl, tr, tr, br, bl]
}

fn write_textured_quad(out: &mut [TexturedVertex], pos: [Vec2; 4], uv: [Vec2; 4]) {
    let pos = quad_order(pos[0], pos[1], pos[2], pos[3]);
    let uv = quad_order(uv[0], uv[1], uv[2], uv[3]);
    for ((vert, pos), uv) in out.iter_mut().zip(pos).zip(uv) {
        *vert = TexturedVertex { pos, uv };
    }
}

/// One decoded record of a finished frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RenderEntry {
    /// Clear the target.
    Clear {
        /// Clear color.
        color: Rgba,
    },
    /// Draw untextured quads from [`FrameView::vertices`].
    Quads {
        /// Fill mode.
        kind: QuadKind,
        /// First vertex of the batch.
        first_vertex: u32,
        /// Number of quads; the batch spans `6 * quad_count` vertices.
        quad_count: u32,
    },
    /// Draw textured quads from [`FrameView::textured_vertices`].
    TexturedQuads {
        /// Texture to bind.
        texture: TextureId,
        /// Tint color.
        color: Color,
        /// First vertex of the batch.
        first_vertex: u32,
        /// Number of quads; the batch spans `6 * quad_count` vertices.
        quad_count: u32,
    },
}

impl RenderEntry {
    /// Vertex range this entry draws from its pool, if it draws any.
    #[must_use]
    pub fn vertex_range(&self) -> Option<Range<usize>> {
        match *self {
            Self::Clear { .. } => None,
            Self::Quads {
                first_vertex,
                quad_count,
                ..
            }
            | Self::TexturedQuads {
                first_vertex,
                quad_count,
                ..
            } => {
                let start = first_vertex as usize;
                Some(start..start + quad_count as usize * VERTS_PER_QUAD)
            }
        }
    }
}

/// A finished frame, as consumed by a backend.
#[derive(Copy, Clone, Debug)]
pub struct FrameView<'a> {
    commands: &'a [u8],
    vertices: &'a [Vertex],
    textured: &'a [TexturedVertex],
    width: u32,
    height: u32,
}

impl<'a> FrameView<'a> {
    /// The written part of the command arena.
    #[must_use]
    pub fn command_bytes(&self) -> &'a [u8] {
        self.commands
    }

    /// The written part of the untextured pool.
    #[must_use]
    pub fn vertices(&self) -> &'a [Vertex] {
        self.vertices
    }

    /// The written part of the textured pool.
    #[must_use]
    pub fn textured_vertices(&self) -> &'a [TexturedVertex] {
        self.textured
    }

    /// Viewport size in pixels.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    /// Walk the records front to back.
    #[must_use]
    pub fn entries(&self) -> Entries<'a> {
        Entries {
            bytes: self.commands,
            offset: 0,
            failed: false,
        }
    }
}

/// Iterator over the records of a [`FrameView`].
///
/// Yields `Err` once and then stops if a record is malformed.
#[derive(Clone, Debug)]
pub struct Entries<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Entries<'_> {
    fn read<T: Pod>(&self, at: usize, header_offset: usize) -> Result<T, DecodeError> {
        let end = at + mem::size_of::<T>();
        self.bytes
            .get(at..end)
            .map(bytemuck::pod_read_unaligned)
            .ok_or(DecodeError::Truncated {
                offset: header_offset,
                needed: end - header_offset,
                available: self.bytes.len() - header_offset,
            })
    }

    fn decode(&self) -> Result<(RenderEntry, usize), DecodeError> {
        let at = self.offset;
        let header: RecordHeader = self.read(at, at)?;
        let tag = CommandTag::try_from(header.tag)
            .map_err(|tag| DecodeError::UnknownCommand { tag, offset: at })?;
        let payload = at + HEADER_SIZE;

        let entry = match tag {
            CommandTag::Clear => {
                let r: ClearRecord = self.read(payload, at)?;
                RenderEntry::Clear { color: r.color }
            }
            CommandTag::Quads => {
                let r: QuadsRecord = self.read(payload, at)?;
                RenderEntry::Quads {
                    kind: QuadKind::try_from(r.kind)?,
                    first_vertex: r.vertex_index,
                    quad_count: r.count,
                }
            }
            CommandTag::TexturedQuads => {
                let r: TexturedQuadsRecord = self.read(payload, at)?;
                RenderEntry::TexturedQuads {
                    texture: r.texture,
                    color: r.color,
                    first_vertex: r.vertex_index,
                    quad_count: r.count,
                }
            }
        };
        Ok((entry, payload + tag.payload_size()))
    }
}

impl Iterator for Entries<'_> {
    type Item = Result<RenderEntry, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }
        match self.decode() {
            Ok((entry, next)) => {
                self.offset = next;
                Some(Ok(entry))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::font::tests::mono_font;

    struct Spans {
        arena: Vec<u8>,
        vertices: Vec<Vertex>,
        textured: Vec<TexturedVertex>,
    }

    impl Spans {
        fn new(arena: usize, vertices: usize, textured: usize) -> Self {
            Self {
                arena: vec![0; arena],
                vertices: vec![Vertex::default(); vertices],
                textured: vec![TexturedVertex::default(); textured],
            }
        }

        fn commands(&mut self) -> RenderCommands<'_> {
            RenderCommands::new(
                &mut self.arena,
                &mut self.vertices,
                &mut self.textured,
                RenderSettings::new(800, 600),
            )
        }
    }

    fn entries(cmds: &RenderCommands<'_>) -> Vec<RenderEntry> {
        cmds.view().entries().collect::<Result<_, _>>().unwrap()
    }

    const RED: Color = Color::rgb(0xff, 0, 0);

    #[test]
    fn record_sizes() {
        assert_eq!(CommandTag::Clear.payload_size(), 16);
        assert_eq!(CommandTag::Quads.payload_size(), 12);
        assert_eq!(CommandTag::TexturedQuads.payload_size(), 16);
    }

    #[test]
    fn same_kind_rects_share_one_batch() {
        let mut spans = Spans::new(1024, 600, 0);
        let mut cmds = spans.commands();
        for i in 0..5 {
            cmds.push_rect(Vec2::new(i as f32, 0.0), Vec2::new(1.0, 1.0), QuadKind::Normal, RED);
        }
        assert_eq!(
            entries(&cmds),
            vec![RenderEntry::Quads {
                kind: QuadKind::Normal,
                first_vertex: 0,
                quad_count: 5
            }]
        );
        assert_eq!(cmds.command_bytes(), 16);
    }

    #[test]
    fn kind_change_or_clear_splits_batches() {
        let mut spans = Spans::new(1024, 600, 0);
        let mut cmds = spans.commands();
        let (p, s) = (Vec2::ZERO, Vec2::new(1.0, 1.0));
        cmds.push_rect(p, s, QuadKind::Normal, RED);
        cmds.push_rect(p, s, QuadKind::Circle, RED);
        cmds.push_clear(Rgba::WHITE);
        cmds.push_rect(p, s, QuadKind::Circle, RED);

        let got = entries(&cmds);
        assert_eq!(got.len(), 4);
        assert_eq!(
            got[3],
            RenderEntry::Quads {
                kind: QuadKind::Circle,
                first_vertex: 12,
                quad_count: 1
            }
        );
    }

    #[test]
    fn rect_vertex_winding() {
        let mut spans = Spans::new(64, 6, 0);
        let mut cmds = spans.commands();
        cmds.push_rect(Vec2::ZERO, Vec2::new(4.0, 3.0), QuadKind::Normal, RED);
        let positions: Vec<_> = cmds.view().vertices().iter().map(|v| (v.pos.x, v.pos.y)).collect();
        assert_eq!(
            positions,
            vec![(0.0, 0.0), (0.0, 3.0), (4.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0)]
        );
        assert!(cmds.view().vertices().iter().all(|v| v.color == RED));
    }

    #[test]
    fn textured_rect_uvs_follow_positions() {
        let mut spans = Spans::new(64, 0, 6);
        let mut cmds = spans.commands();
        cmds.push_textured_rect(
            Vec2::new(10.0, 10.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.25, 0.5),
            Vec2::new(0.75, 1.0),
            TextureId::new(3),
            Color::WHITE,
        );
        let uvs: Vec<_> = cmds
            .view()
            .textured_vertices()
            .iter()
            .map(|v| (v.uv.x, v.uv.y))
            .collect();
        assert_eq!(
            uvs,
            vec![(0.25, 0.5), (0.25, 1.0), (0.75, 0.5), (0.75, 0.5), (0.75, 1.0), (0.25, 1.0)]
        );
        assert_eq!(cmds.view().textured_vertices()[4].pos, Vec2::new(12.0, 12.0));
    }

    #[test]
    fn textured_batch_key_is_color_not_texture() {
        let mut spans = Spans::new(256, 0, 60);
        let mut cmds = spans.commands();
        let (p, s) = (Vec2::ZERO, Vec2::new(1.0, 1.0));
        cmds.push_textured_rect(p, s, p, s, TextureId::new(1), Color::WHITE);
        cmds.push_textured_rect(p, s, p, s, TextureId::new(2), Color::WHITE);
        cmds.push_textured_rect(p, s, p, s, TextureId::new(2), RED);

        assert_eq!(
            entries(&cmds),
            vec![
                RenderEntry::TexturedQuads {
                    texture: TextureId::new(1),
                    color: Color::WHITE,
                    first_vertex: 0,
                    quad_count: 2
                },
                RenderEntry::TexturedQuads {
                    texture: TextureId::new(2),
                    color: RED,
                    first_vertex: 12,
                    quad_count: 1
                },
            ]
        );
    }

    #[test]
    fn opening_a_quads_batch_closes_the_textured_one() {
        let font = mono_font(TextureId::new(1));
        let mut spans = Spans::new(256, 60, 60);
        let mut cmds = spans.commands();
        let mut pen = Vec2::new(0.0, 20.0);
        cmds.draw_text(&mut pen, RED, &font, "a");
        cmds.push_rect(Vec2::ZERO, Vec2::new(1.0, 1.0), QuadKind::Normal, RED);
        cmds.draw_text(&mut pen, RED, &font, "b");
        assert_eq!(entries(&cmds).len(), 3);
    }

    #[test]
    fn draw_text_advances_origin_and_counts_chars() {
        let font = mono_font(TextureId::new(9));
        let mut spans = Spans::new(256, 0, 60);
        let mut cmds = spans.commands();
        let mut pen = Vec2::new(5.0, 20.0);
        cmds.draw_text(&mut pen, RED, &font, "hi");
        cmds.draw_text(&mut pen, RED, &font, "!");
        assert_eq!(pen, Vec2::new(29.0, 20.0));
        assert_eq!(
            entries(&cmds),
            vec![RenderEntry::TexturedQuads {
                texture: TextureId::new(9),
                color: RED,
                first_vertex: 0,
                quad_count: 3
            }]
        );
        let v = cmds.view().textured_vertices();
        assert_eq!(v[0].pos, Vec2::new(5.0, 10.0));
        assert_eq!(v[4].pos, Vec2::new(13.0, 22.0));
        assert_eq!(v[6].pos, Vec2::new(13.0, 10.0));
    }

    #[test]
    fn empty_text_writes_nothing() {
        let font = mono_font(TextureId::new(1));
        let mut spans = Spans::new(64, 0, 6);
        let mut cmds = spans.commands();
        cmds.draw_text(&mut Vec2::ZERO, RED, &font, "");
        assert_eq!(cmds.command_bytes(), 0);
    }

    #[test]
    fn full_vertex_pool_drops_the_draw() {
        let mut spans = Spans::new(256, 12, 0);
        let mut cmds = spans.commands();
        let (p, s) = (Vec2::ZERO, Vec2::new(1.0, 1.0));
        cmds.push_rect(p, s, QuadKind::Normal, RED);
        cmds.push_rect(p, s, QuadKind::Normal, RED);
        let bytes = cmds.command_bytes();
        cmds.push_rect(p, s, QuadKind::Normal, RED);
        cmds.push_rect(p, s, QuadKind::Dashed, RED);
        assert_eq!(cmds.vertex_count(), 12);
        assert_eq!(cmds.command_bytes(), bytes);
        assert_eq!(
            entries(&cmds),
            vec![RenderEntry::Quads {
                kind: QuadKind::Normal,
                first_vertex: 0,
                quad_count: 2
            }]
        );
    }

    #[test]
    fn full_textured_pool_drops_the_rect() {
        let mut spans = Spans::new(256, 0, 6);
        let mut cmds = spans.commands();
        let (p, s) = (Vec2::ZERO, Vec2::new(1.0, 1.0));
        let (uv0, uv1) = (Vec2::ZERO, Vec2::new(1.0, 1.0));
        cmds.push_textured_rect(p, s, uv0, uv1, TextureId::new(2), Color::WHITE);
        let bytes = cmds.command_bytes();
        cmds.push_textured_rect(p, s, uv0, uv1, TextureId::new(2), RED);
        assert_eq!(cmds.textured_vertex_count(), 6);
        assert_eq!(cmds.command_bytes(), bytes);
        assert_eq!(
            entries(&cmds),
            vec![RenderEntry::TexturedQuads {
                texture: TextureId::new(2),
                color: Color::WHITE,
                first_vertex: 0,
                quad_count: 1
            }]
        );
    }

    #[test]
    fn text_that_does_not_fit_is_dropped_whole() {
        let font = mono_font(TextureId::new(1));
        let mut spans = Spans::new(256, 0, 12);
        let mut cmds = spans.commands();
        let mut pen = Vec2::ZERO;
        cmds.draw_text(&mut pen, RED, &font, "abc");
        assert_eq!(cmds.textured_vertex_count(), 0);
        assert_eq!(pen, Vec2::ZERO);
    }

    #[test]
    #[should_panic(expected = "render command buffer is full")]
    fn arena_overflow_is_fatal() {
        let mut spans = Spans::new(40, 0, 0);
        let mut cmds = spans.commands();
        cmds.push_clear(Rgba::WHITE);
        cmds.push_clear(Rgba::WHITE);
        cmds.push_clear(Rgba::WHITE);
    }

    #[test]
    fn reset_rewinds_everything() {
        let mut spans = Spans::new(256, 60, 0);
        let mut cmds = spans.commands();
        cmds.push_rect(Vec2::ZERO, Vec2::new(1.0, 1.0), QuadKind::Normal, RED);
        cmds.reset();
        assert_eq!(cmds.command_bytes(), 0);
        assert_eq!(cmds.vertex_count(), 0);
        cmds.push_rect(Vec2::ZERO, Vec2::new(1.0, 1.0), QuadKind::Normal, RED);
        assert_eq!(entries(&cmds).len(), 1);
    }

    #[test]
    fn unknown_tag_is_reported_once() {
        let bytes = 7u32.to_ne_bytes();
        let view = FrameView {
            commands: &bytes,
            vertices: &[],
            textured: &[],
            width: 1,
            height: 1,
        };
        let got: Vec<_> = view.entries().collect();
        assert_eq!(
            got,
            vec![Err(DecodeError::UnknownCommand { tag: 7, offset: 0 })]
        );
    }

    #[test]
    fn truncated_record_is_reported() {
        let mut bytes = 1u32.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&[0; 4]);
        let view = FrameView {
            commands: &bytes,
            vertices: &[],
            textured: &[],
            width: 1,
            height: 1,
        };
        assert_eq!(
            view.entries().next(),
            Some(Err(DecodeError::Truncated {
                offset: 0,
                needed: 16,
                available: 8
            }))
        );
    }
}
