//! An immediate-mode board UI over a deferred render-command buffer.
//!
//! Application code describes each frame by appending type-tagged records
//! to a fixed-capacity byte arena through [`RenderCommands`]. Consecutive
//! compatible draws are coalesced online into a single batch. Once per frame
//! a [`Backend`] walks the finished buffer front to back and issues one draw
//! per record.
//!
//! Beneath the command buffer sits a small memory substrate:
//!
//! - [`Allocator`]: a cloneable allocation capability with heap and arena
//!   implementations.
//! - [`Array`]: a growable sequence of `Copy` elements drawing on an
//!   allocator, growing to `2 * capacity + 8`.
//! - [`U64Map`]: an open-addressing map from non-zero `u64` keys.
//!
//! # Features
//!
//! - **`glow`** (default): [`GlRenderer`], an OpenGL 3.1 backend built on
//!   [glow], with PNG/JPEG texture decoding via [image].
//!
//! # Safety
//!
//! Submitting a frame is `unsafe` because GPU backends issue raw GL calls
//! and need a current context. [`DrawLog`] has no such requirement.
//!
//! [glow]: https://docs.rs/glow
//! [image]: https://docs.rs/image

mod allocator;
mod array;
mod backend;
mod board;
mod command;
mod config;
mod error;
mod font;
mod frame;
mod map;
#[cfg(feature = "glow")]
mod render;
#[cfg(feature = "glow")]
mod shaders;
mod slots;
mod types;
pub mod ui;

pub use allocator::{
    AllocOp, AllocRequest, Allocator, ArenaAllocator, HeapAllocator, RawAllocator,
};
pub use array::{grow_capacity, Array};
pub use backend::{Backend, DrawLog};
pub use board::{parse_boards, Board};
pub use command::{
    ClearRecord, CommandTag, Entries, FrameView, QuadKind, QuadsRecord, RecordHeader,
    RenderCommands, RenderEntry, RenderSettings, TexturedQuadsRecord, VERTS_PER_QUAD,
};
pub use config::{FrameBudget, RenderConfig};
#[cfg(feature = "glow")]
pub use error::BackendError;
pub use error::{BoardError, ConfigError, DecodeError};
pub use font::{AlignedQuad, Font, PackedChar};
pub use frame::{FrameMemory, FrameStats};
pub use map::{MapFind, U64Map, EMPTY_KEY};
#[cfg(feature = "glow")]
pub use render::GlRenderer;
pub use types::{Color, Rgba, TextureId, TexturedVertex, Vec2, Vertex};
