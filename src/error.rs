//! Error types for the recoverable failure paths.
//!
//! Capacity exhaustion of the command arena and allocator exhaustion are not
//! represented here: those conditions abort instead of returning.

use thiserror::Error;

/// Errors raised while walking a finished command buffer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// A record header carried a tag that names no known command.
    #[error("unknown render command tag {tag} at byte offset {offset}")]
    UnknownCommand {
        /// The raw tag value.
        tag: u32,
        /// Byte offset of the record header.
        offset: usize,
    },

    /// A `Quads` record carried an unknown quad kind.
    #[error("unknown quad kind {0}")]
    UnknownQuadKind(u32),

    /// The buffer ended in the middle of a record.
    #[error("truncated command at offset {offset}: need {needed} bytes, have {available}")]
    Truncated {
        /// Byte offset of the record header.
        offset: usize,
        /// Bytes required for the full record.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
}

/// Errors raised while loading a [`RenderConfig`](crate::config::RenderConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration text is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A capacity was zero or out of range.
    #[error("invalid frame budget: {0}")]
    InvalidBudget(String),
}

/// Errors raised while parsing a board list.
#[derive(Error, Debug)]
pub enum BoardError {
    /// The payload is not valid JSON.
    #[error("malformed board list: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level JSON value is not an array.
    #[error("board list must be a JSON array, found {0}")]
    NotArray(&'static str),

    /// An element of the board list is not an object.
    #[error("board {index} must be a JSON object, found {found}")]
    NotObject {
        /// Position of the offending element.
        index: usize,
        /// JSON type that was found instead.
        found: &'static str,
    },
}

/// Errors raised by the OpenGL consumer.
#[cfg(feature = "glow")]
#[derive(Error, Debug)]
pub enum BackendError {
    /// A shader stage failed to compile.
    #[error("shader compile error: {0}")]
    ShaderCompile(String),

    /// A shader program failed to link.
    #[error("program link error: {0}")]
    ProgramLink(String),

    /// A uniform the renderer depends on is missing from a program.
    #[error("uniform `{0}` missing from shader program")]
    MissingUniform(&'static str),

    /// A GL object could not be created.
    #[error("GL object creation failed: {0}")]
    Gl(String),

    /// Encoded image data could not be decoded.
    #[error("failed to decode texture image: {0}")]
    Image(#[from] image::ImageError),

    /// Pixel data does not match the declared texture dimensions.
    #[error("texture data is {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    TextureSize {
        /// Declared width in pixels.
        width: u32,
        /// Declared height in pixels.
        height: u32,
        /// Byte length required.
        expected: usize,
        /// Byte length supplied.
        actual: usize,
    },

    /// Every texture slot is in use.
    #[error("all {0} texture slots are in use")]
    TextureSlotsExhausted(usize),

    /// A textured command referenced a texture this renderer never created.
    #[error("unknown texture id {0}")]
    UnknownTexture(u32),

    /// The command buffer could not be walked.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
