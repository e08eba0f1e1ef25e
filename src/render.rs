//! The OpenGL consumer: owns GL state, walks finished frames, and issues
//! one draw call per command.

use std::sync::Arc;

use glow::{HasContext, PixelUnpackData};

use crate::{
    backend::Backend,
    command::{FrameView, QuadKind, RenderEntry},
    error::BackendError,
    shaders,
    slots::TextureSlots,
    types::{TextureId, TexturedVertex, Vertex},
};

/// GL internal format for RGBA8 textures, pre-cast to the `i32` that
/// `tex_image_2d` expects.
#[expect(clippy::cast_possible_wrap)]
const RGBA8_INTERNAL_FORMAT: i32 = glow::RGBA8 as i32;

/// Convert a `u32` to `i32` for GL API calls.
///
/// # Panics
///
/// Panics if `value > i32::MAX`. In practice, this is unreachable for
/// normal viewport dimensions and image sizes.
fn gl_size(value: u32) -> i32 {
    i32::try_from(value).expect("dimension exceeds i32::MAX")
}

/// Convert a vertex index or count to the `i32` that `draw_arrays` takes.
///
/// # Panics
///
/// Panics if `value > i32::MAX`, which only a pool configured beyond
/// `i32::MAX` vertices can reach.
fn gl_count(value: usize) -> i32 {
    i32::try_from(value).expect("vertex count exceeds i32::MAX")
}

/// Number of bytes in a tightly packed RGBA8 image, if it fits in memory.
fn rgba_len(width: u32, height: u32) -> Option<usize> {
    usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)?
        .checked_mul(4)
}

/// Expand a one-channel coverage mask (a rasterized font atlas) to white
/// RGBA8 pixels whose alpha is the coverage.
fn coverage_to_rgba(coverage: &[u8]) -> Vec<u8> {
    coverage.iter().flat_map(|&a| [0xff, 0xff, 0xff, a]).collect()
}

/// Cached uniform locations for the quad program.
struct QuadUniforms {
    /// `u_resolution`: viewport size in pixels.
    resolution: glow::UniformLocation,
    /// `u_kind`: 0 = normal, 1 = dashed, 2 = circle.
    kind: glow::UniformLocation,
}

/// Cached uniform locations for the textured program.
struct TexturedUniforms {
    /// `u_resolution`: viewport size in pixels.
    resolution: glow::UniformLocation,
    /// `u_texture`: texture unit index (always 0).
    texture: glow::UniformLocation,
    /// `u_tint`: batch color.
    tint: glow::UniformLocation,
}

/// Which program is bound while walking a frame.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Bound {
    None,
    Quads,
    Textured,
}

/// An OpenGL backend for finished frames.
///
/// Both vertex pools are uploaded once per frame; afterwards every command
/// is a single `draw_arrays` over its vertex range. Textures are created
/// through the renderer and referenced by [`TextureId`].
///
/// # Example
///
/// ```no_run
/// # use corkboard::{Allocator, FrameBudget, FrameMemory, GlRenderer, RenderSettings};
/// # use std::sync::Arc;
/// # fn example(gl: Arc<glow::Context>) -> Result<(), corkboard::BackendError> {
/// // During setup (with a current GL context):
/// let mut renderer = unsafe { GlRenderer::new(gl, 256) }?;
/// let mut memory = FrameMemory::new(&FrameBudget::default(), &Allocator::heap());
///
/// // Each frame:
/// unsafe {
///     memory.run_frame(RenderSettings::new(800, 600), &mut renderer, |cmds| {
///         cmds.push_clear(corkboard::Rgba::WHITE);
///     })
/// }?;
/// # Ok(())
/// # }
/// ```
pub struct GlRenderer {
    /// The OpenGL context, shared via [`Arc`] so it can be stored alongside
    /// resources that reference it.
    gl: Arc<glow::Context>,

    /// Program for untextured quads.
    quad_program: glow::Program,
    /// Cached uniform locations for [`quad_program`](Self::quad_program).
    quad_uniforms: QuadUniforms,

    /// Program for textured quads.
    textured_program: glow::Program,
    /// Cached uniform locations for
    /// [`textured_program`](Self::textured_program).
    textured_uniforms: TexturedUniforms,

    /// Vertex array over [`quad_vbo`](Self::quad_vbo): `vec2` position and
    /// normalized `u8x4` color.
    quad_vao: glow::VertexArray,
    /// Buffer receiving the untextured pool each frame.
    quad_vbo: glow::Buffer,

    /// Vertex array over [`textured_vbo`](Self::textured_vbo): `vec2`
    /// position and `vec2` UV.
    textured_vao: glow::VertexArray,
    /// Buffer receiving the textured pool each frame.
    textured_vbo: glow::Buffer,

    /// Live GL textures by id.
    textures: TextureSlots<glow::Texture>,
}

impl GlRenderer {
    /// Create a new renderer able to hold `texture_slots` textures at once.
    ///
    /// Compiles both shader programs and creates the vertex arrays and
    /// buffers.
    ///
    /// # Safety
    ///
    /// The `gl` context must be current and valid. The caller must ensure
    /// that [`destroy`](Self::destroy) is called before the context is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if shader compilation, program linking, uniform
    /// lookup, or GL object creation fails.
    ///
    /// # Panics
    ///
    /// Panics if `texture_slots` is zero.
    #[expect(clippy::too_many_lines)] // GL initialization is inherently verbose
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        texture_slots: usize,
    ) -> Result<Self, BackendError> {
        assert!(texture_slots > 0, "renderer needs at least one texture slot");

        let quad_program = unsafe {
            shaders::compile_program(
                &gl,
                shaders::QUAD_VERTEX_SRC,
                shaders::QUAD_FRAGMENT_SRC,
                &[
                    (shaders::POSITION_ATTRIB, "a_position"),
                    (shaders::SECOND_ATTRIB, "a_color"),
                ],
            )?
        };
        let textured_program = unsafe {
            shaders::compile_program(
                &gl,
                shaders::TEXTURED_VERTEX_SRC,
                shaders::TEXTURED_FRAGMENT_SRC,
                &[
                    (shaders::POSITION_ATTRIB, "a_position"),
                    (shaders::SECOND_ATTRIB, "a_uv"),
                ],
            )?
        };

        let quad_uniforms = unsafe {
            QuadUniforms {
                resolution: shaders::uniform(&gl, quad_program, "u_resolution")?,
                kind: shaders::uniform(&gl, quad_program, "u_kind")?,
            }
        };
        let textured_uniforms = unsafe {
            TexturedUniforms {
                resolution: shaders::uniform(&gl, textured_program, "u_resolution")?,
                texture: shaders::uniform(&gl, textured_program, "u_texture")?,
                tint: shaders::uniform(&gl, textured_program, "u_tint")?,
            }
        };

        // Vertex strides are 12 and 16 bytes, well within i32 range.
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let (quad_stride, textured_stride) = (
            std::mem::size_of::<Vertex>() as i32,
            std::mem::size_of::<TexturedVertex>() as i32,
        );

        let (quad_vao, quad_vbo, textured_vao, textured_vbo) = unsafe {
            let quad_vao = gl.create_vertex_array().map_err(BackendError::Gl)?;
            let quad_vbo = gl.create_buffer().map_err(BackendError::Gl)?;
            gl.bind_vertex_array(Some(quad_vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(quad_vbo));
            gl.enable_vertex_attrib_array(shaders::POSITION_ATTRIB);
            gl.vertex_attrib_pointer_f32(
                shaders::POSITION_ATTRIB,
                2,
                glow::FLOAT,
                false,
                quad_stride,
                0,
            );
            gl.enable_vertex_attrib_array(shaders::SECOND_ATTRIB);
            gl.vertex_attrib_pointer_f32(
                shaders::SECOND_ATTRIB,
                4,
                glow::UNSIGNED_BYTE,
                true,
                quad_stride,
                8,
            );

            let textured_vao = gl.create_vertex_array().map_err(BackendError::Gl)?;
            let textured_vbo = gl.create_buffer().map_err(BackendError::Gl)?;
            gl.bind_vertex_array(Some(textured_vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(textured_vbo));
            gl.enable_vertex_attrib_array(shaders::POSITION_ATTRIB);
            gl.vertex_attrib_pointer_f32(
                shaders::POSITION_ATTRIB,
                2,
                glow::FLOAT,
                false,
                textured_stride,
                0,
            );
            gl.enable_vertex_attrib_array(shaders::SECOND_ATTRIB);
            gl.vertex_attrib_pointer_f32(
                shaders::SECOND_ATTRIB,
                2,
                glow::FLOAT,
                false,
                textured_stride,
                8,
            );

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            (quad_vao, quad_vbo, textured_vao, textured_vbo)
        };

        tracing::info!(texture_slots, "OpenGL renderer ready");

        Ok(Self {
            gl,
            quad_program,
            quad_uniforms,
            textured_program,
            textured_uniforms,
            quad_vao,
            quad_vbo,
            textured_vao,
            textured_vbo,
            textures: TextureSlots::new(texture_slots),
        })
    }

    /// Decode an encoded image (PNG or JPEG) and upload it as a texture.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one passed to
    /// [`new`](Self::new).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Image`] if decoding fails and
    /// [`BackendError::TextureSlotsExhausted`] if no slot is free.
    pub unsafe fn create_texture(&mut self, encoded: &[u8]) -> Result<TextureId, BackendError> {
        let image = image::load_from_memory(encoded)?.to_rgba8();
        let (width, height) = image.dimensions();
        unsafe { self.create_texture_rgba(width, height, image.as_raw()) }
    }

    /// Upload a one-channel coverage mask, such as a packed font atlas, as a
    /// white texture with the mask in alpha.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one passed to
    /// [`new`](Self::new).
    ///
    /// # Errors
    ///
    /// As [`create_texture_rgba`](Self::create_texture_rgba).
    pub unsafe fn create_texture_alpha(
        &mut self,
        width: u32,
        height: u32,
        coverage: &[u8],
    ) -> Result<TextureId, BackendError> {
        let pixels = coverage_to_rgba(coverage);
        unsafe { self.create_texture_rgba(width, height, &pixels) }
    }

    /// Upload straight-alpha RGBA8 pixels as a texture.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one passed to
    /// [`new`](Self::new).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::TextureSize`] if `pixels` does not hold
    /// exactly `width * height` pixels, [`BackendError::TextureSlotsExhausted`]
    /// if no slot is free, and [`BackendError::Gl`] if the texture cannot be
    /// created.
    pub unsafe fn create_texture_rgba(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureId, BackendError> {
        let expected = rgba_len(width, height).unwrap_or(usize::MAX);
        if pixels.len() != expected {
            return Err(BackendError::TextureSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        if self.textures.is_full() {
            return Err(BackendError::TextureSlotsExhausted(self.textures.limit()));
        }

        let gl = &self.gl;
        let texture = unsafe { gl.create_texture() }.map_err(BackendError::Gl)?;
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                RGBA8_INTERNAL_FORMAT,
                gl_size(width),
                gl_size(height),
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(Some(pixels)),
            );
            Self::set_default_tex_params(gl);
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
        let (id, slot) = match self.textures.insert(texture) {
            Ok(entry) => entry,
            Err(texture) => {
                unsafe { gl.delete_texture(texture) };
                return Err(BackendError::TextureSlotsExhausted(self.textures.limit()));
            }
        };

        tracing::debug!(
            id = id.raw(),
            slot,
            live = self.textures.len(),
            width,
            height,
            "texture created"
        );
        Ok(id)
    }

    /// Delete a texture. Unknown ids are ignored.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one passed to
    /// [`new`](Self::new).
    pub unsafe fn delete_texture(&mut self, id: TextureId) {
        let Some(texture) = self.textures.remove(id) else {
            return;
        };
        unsafe { self.gl.delete_texture(texture) };
        tracing::debug!(id = id.raw(), live = self.textures.len(), "texture deleted");
    }

    /// GL texture behind `id`.
    fn texture(&self, id: TextureId) -> Result<glow::Texture, BackendError> {
        self.textures
            .get(id)
            .ok_or(BackendError::UnknownTexture(id.raw()))
    }

    /// Draw `frame` into the currently bound framebuffer.
    ///
    /// Commands drawn before a malformed record stay on screen; the walk
    /// stops at the bad record and its error is returned.
    ///
    /// # Safety
    ///
    /// Requires a current GL context matching the one passed to
    /// [`new`](Self::new).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Decode`] for a malformed command buffer and
    /// [`BackendError::UnknownTexture`] for a texture this renderer does not
    /// hold.
    pub unsafe fn render(&mut self, frame: &FrameView<'_>) -> Result<(), BackendError> {
        let [width, height] = frame.size();
        // Precision loss is acceptable: viewport dimensions are small
        // relative to f32 mantissa range.
        #[expect(clippy::cast_precision_loss)]
        let resolution = [width as f32, height as f32];

        let gl = &self.gl;
        unsafe {
            gl.viewport(0, 0, gl_size(width), gl_size(height));
            // Set up blending for premultiplied alpha.
            gl.enable(glow::BLEND);
            gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.quad_vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(frame.vertices()),
                glow::STREAM_DRAW,
            );
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.textured_vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(frame.textured_vertices()),
                glow::STREAM_DRAW,
            );
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            gl.use_program(Some(self.quad_program));
            gl.uniform_2_f32(
                Some(&self.quad_uniforms.resolution),
                resolution[0],
                resolution[1],
            );
            gl.use_program(Some(self.textured_program));
            gl.uniform_2_f32(
                Some(&self.textured_uniforms.resolution),
                resolution[0],
                resolution[1],
            );
            gl.uniform_1_i32(Some(&self.textured_uniforms.texture), 0);
            gl.use_program(None);
        }

        let mut bound = Bound::None;
        let mut result = Ok(());
        for entry in frame.entries() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(%err, "aborting frame on malformed command");
                    result = Err(err.into());
                    break;
                }
            };
            if let Err(err) = unsafe { self.draw_entry(entry, &mut bound) } {
                result = Err(err);
                break;
            }
        }

        unsafe {
            gl.bind_vertex_array(None);
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.use_program(None);
            gl.disable(glow::BLEND);
        }
        result
    }

    /// Issue the GL calls for one command.
    unsafe fn draw_entry(
        &self,
        entry: RenderEntry,
        bound: &mut Bound,
    ) -> Result<(), BackendError> {
        let gl = &self.gl;
        match entry {
            RenderEntry::Clear { color } => {
                let [r, g, b, a] = color.to_array();
                unsafe {
                    gl.clear_color(r, g, b, a);
                    gl.clear(glow::COLOR_BUFFER_BIT);
                }
            }
            RenderEntry::Quads { kind, .. } => {
                let Some(range) = entry.vertex_range() else {
                    return Ok(());
                };
                unsafe {
                    if *bound != Bound::Quads {
                        gl.use_program(Some(self.quad_program));
                        gl.bind_vertex_array(Some(self.quad_vao));
                        *bound = Bound::Quads;
                    }
                    gl.uniform_1_i32(Some(&self.quad_uniforms.kind), kind_index(kind));
                    gl.draw_arrays(glow::TRIANGLES, gl_count(range.start), gl_count(range.len()));
                }
            }
            RenderEntry::TexturedQuads { texture, color, .. } => {
                let Some(range) = entry.vertex_range() else {
                    return Ok(());
                };
                let texture = self.texture(texture)?;
                let [r, g, b, a] = color.to_rgba().to_array();
                unsafe {
                    if *bound != Bound::Textured {
                        gl.use_program(Some(self.textured_program));
                        gl.bind_vertex_array(Some(self.textured_vao));
                        gl.active_texture(glow::TEXTURE0);
                        *bound = Bound::Textured;
                    }
                    gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                    gl.uniform_4_f32(Some(&self.textured_uniforms.tint), r, g, b, a);
                    gl.draw_arrays(glow::TRIANGLES, gl_count(range.start), gl_count(range.len()));
                }
            }
        }
        Ok(())
    }

    /// Set default texture filtering and wrapping parameters.
    unsafe fn set_default_tex_params(gl: &glow::Context) {
        // GL constant values are small enough that the cast is always safe.
        #[expect(clippy::cast_possible_wrap)]
        unsafe {
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
        }
    }

    /// Delete all GL resources owned by this renderer, textures included.
    ///
    /// # Safety
    ///
    /// Must be called with the same GL context that was used to create the
    /// renderer, and must be called exactly once.
    pub unsafe fn destroy(&self) {
        let gl = &self.gl;
        unsafe {
            gl.delete_program(self.quad_program);
            gl.delete_program(self.textured_program);
            gl.delete_vertex_array(self.quad_vao);
            gl.delete_buffer(self.quad_vbo);
            gl.delete_vertex_array(self.textured_vao);
            gl.delete_buffer(self.textured_vbo);
            for texture in self.textures.handles() {
                gl.delete_texture(texture);
            }
        }
    }
}

impl Backend for GlRenderer {
    type Error = BackendError;

    unsafe fn submit(&mut self, frame: &FrameView<'_>) -> Result<(), BackendError> {
        unsafe { self.render(frame) }
    }
}

/// Value of `u_kind` for a fill mode.
fn kind_index(kind: QuadKind) -> i32 {
    match kind {
        QuadKind::Normal => 0,
        QuadKind::Dashed => 1,
        QuadKind::Circle => 2,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rgba_len_counts_four_bytes_per_pixel() {
        assert_eq!(rgba_len(3, 2), Some(24));
        assert_eq!(rgba_len(0, 100), Some(0));
    }

    #[test]
    fn rgba_len_rejects_overflow() {
        assert_eq!(rgba_len(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn coverage_becomes_white_alpha() {
        assert_eq!(
            coverage_to_rgba(&[0, 128, 255]),
            vec![255, 255, 255, 0, 255, 255, 255, 128, 255, 255, 255, 255]
        );
    }

    #[test]
    fn kind_indices_match_fragment_shader() {
        assert_eq!(kind_index(QuadKind::Normal), 0);
        assert_eq!(kind_index(QuadKind::Dashed), 1);
        assert_eq!(kind_index(QuadKind::Circle), 2);
        assert!(shaders::QUAD_FRAGMENT_SRC.contains("u_kind == 1"));
        assert!(shaders::QUAD_FRAGMENT_SRC.contains("u_kind == 2"));
    }

    #[test]
    fn vertex_layouts_match_attribute_offsets() {
        assert_eq!(std::mem::size_of::<Vertex>(), 12);
        assert_eq!(std::mem::offset_of!(Vertex, color), 8);
        assert_eq!(std::mem::size_of::<TexturedVertex>(), 16);
        assert_eq!(std::mem::offset_of!(TexturedVertex, uv), 8);
    }
}
