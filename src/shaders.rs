//! GLSL shader sources and compilation helpers.
//!
//! All shaders target GLSL 1.40 (OpenGL 3.1), which is widely supported on
//! desktop platforms. Positions arrive in pixels with the origin at the top
//! left and are flipped into GL clip space in the vertex stage.

use glow::HasContext;

use crate::error::BackendError;

/// Attribute slot of the pixel position in both programs.
pub const POSITION_ATTRIB: u32 = 0;
/// Attribute slot of the per-vertex color (quad program) or UV (textured
/// program).
pub const SECOND_ATTRIB: u32 = 1;

/// Vertex shader for untextured quads.
///
/// Besides the position and color it emits the corner-local coordinate of
/// each vertex, recovered from `gl_VertexID` and the fixed six-vertex
/// winding `TL, BL, TR, TR, BR, BL`. Every quad starts at a multiple of six
/// in the vertex pool, so the lookup is exact.
///
/// # Uniforms
///
/// | Name           | Type   | Description             |
/// |----------------|--------|-------------------------|
/// | `u_resolution` | `vec2` | Viewport size in pixels |
pub const QUAD_VERTEX_SRC: &str = r"#version 140

in vec2 a_position;
in vec4 a_color;

uniform vec2 u_resolution;

out vec4 v_color;
out vec2 v_local;

const vec2 CORNERS[6] = vec2[6](
    vec2(0.0, 0.0),
    vec2(0.0, 1.0),
    vec2(1.0, 0.0),
    vec2(1.0, 0.0),
    vec2(1.0, 1.0),
    vec2(0.0, 1.0)
);

void main() {
    v_color = a_color;
    v_local = CORNERS[gl_VertexID % 6];

    vec2 ndc = (a_position / u_resolution) * 2.0 - 1.0;
    ndc.y = -ndc.y;

    gl_Position = vec4(ndc, 0.0, 1.0);
}
";

/// Fragment shader for untextured quads.
///
/// `u_kind` selects the fill:
///
/// | Value | Mode   | Coverage                                   |
/// |-------|--------|--------------------------------------------|
/// | `0`   | Normal | whole rectangle                            |
/// | `1`   | Dashed | diagonal 4 px stripes, every other dropped |
/// | `2`   | Circle | ellipse inscribed in the rectangle         |
///
/// Output is premultiplied by alpha.
pub const QUAD_FRAGMENT_SRC: &str = r"#version 140

in vec4 v_color;
in vec2 v_local;

uniform int u_kind;

out vec4 frag_color;

void main() {
    float coverage = 1.0;
    if (u_kind == 1) {
        float stripe = floor((gl_FragCoord.x + gl_FragCoord.y) / 4.0);
        if (mod(stripe, 2.0) >= 1.0) {
            discard;
        }
    } else if (u_kind == 2) {
        vec2 d = v_local * 2.0 - 1.0;
        float r = length(d);
        float edge = fwidth(r);
        coverage = 1.0 - smoothstep(1.0 - edge, 1.0, r);
        if (coverage <= 0.0) {
            discard;
        }
    }

    frag_color = v_color;
    frag_color.a *= coverage;
    frag_color.rgb *= frag_color.a;
}
";

/// Vertex shader for textured quads.
///
/// # Uniforms
///
/// | Name           | Type   | Description             |
/// |----------------|--------|-------------------------|
/// | `u_resolution` | `vec2` | Viewport size in pixels |
pub const TEXTURED_VERTEX_SRC: &str = r"#version 140

in vec2 a_position;
in vec2 a_uv;

uniform vec2 u_resolution;

out vec2 v_uv;

void main() {
    v_uv = a_uv;

    vec2 ndc = (a_position / u_resolution) * 2.0 - 1.0;
    ndc.y = -ndc.y;

    gl_Position = vec4(ndc, 0.0, 1.0);
}
";

/// Fragment shader for textured quads.
///
/// Samples the bound texture, multiplies by the batch tint and premultiplies
/// the result by alpha.
///
/// # Uniforms
///
/// | Name        | Type        | Description                  |
/// |-------------|-------------|------------------------------|
/// | `u_texture` | `sampler2D` | Bound texture unit (always 0) |
/// | `u_tint`    | `vec4`      | Batch color, straight alpha  |
pub const TEXTURED_FRAGMENT_SRC: &str = r"#version 140

in vec2 v_uv;

uniform sampler2D u_texture;
uniform vec4 u_tint;

out vec4 frag_color;

void main() {
    frag_color = texture(u_texture, v_uv) * u_tint;
    frag_color.rgb *= frag_color.a;
}
";

/// Compile a shader program from vertex and fragment source strings.
///
/// `attributes` are bound to their slots before linking so both programs
/// agree with the vertex array layouts. The compiled shader objects are
/// detached and deleted after successful linking, so only the program handle
/// needs to be cleaned up by the caller.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns [`BackendError::ShaderCompile`] or [`BackendError::ProgramLink`]
/// with the driver's info log.
pub unsafe fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
    attributes: &[(u32, &str)],
) -> Result<glow::Program, BackendError> {
    let program = unsafe { gl.create_program() }.map_err(BackendError::Gl)?;

    let vs = unsafe { compile_shader(gl, glow::VERTEX_SHADER, vertex_src) }?;
    let fs = match unsafe { compile_shader(gl, glow::FRAGMENT_SHADER, fragment_src) } {
        Ok(fs) => fs,
        Err(err) => {
            unsafe {
                gl.delete_shader(vs);
                gl.delete_program(program);
            }
            return Err(err);
        }
    };

    unsafe {
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        for &(index, name) in attributes {
            gl.bind_attrib_location(program, index, name);
        }
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(BackendError::ProgramLink(log));
        }

        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
    }

    Ok(program)
}

/// Compile a single shader stage (vertex or fragment) from source.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader, BackendError> {
    unsafe {
        let shader = gl.create_shader(shader_type).map_err(BackendError::Gl)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(BackendError::ShaderCompile(log));
        }

        Ok(shader)
    }
}

/// Look up a uniform the renderer cannot work without.
///
/// # Safety
///
/// Requires a valid, current OpenGL context that owns `program`.
///
/// # Errors
///
/// Returns [`BackendError::MissingUniform`] if the linker dropped or never
/// saw `name`.
pub unsafe fn uniform(
    gl: &glow::Context,
    program: glow::Program,
    name: &'static str,
) -> Result<glow::UniformLocation, BackendError> {
    unsafe { gl.get_uniform_location(program, name) }.ok_or(BackendError::MissingUniform(name))
}
