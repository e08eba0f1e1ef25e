//! Consumers of finished frames.
//!
//! A [`Backend`] walks a [`FrameView`] once per frame and issues one draw
//! call per record. [`DrawLog`] is a headless backend that records what it
//! would have drawn; the OpenGL backend lives in
//! [`GlRenderer`](crate::GlRenderer) behind the `glow` feature.

use crate::command::{FrameView, RenderEntry};
use crate::error::DecodeError;

/// Something that can draw a finished frame.
pub trait Backend {
    /// Error returned when a frame cannot be drawn.
    type Error;

    /// Draw every record of `frame`, front to back.
    ///
    /// An unrecognized record must abort the frame with an error.
    ///
    /// # Safety
    ///
    /// Implementation-defined. GPU backends typically require their graphics
    /// context to be current on the calling thread.
    unsafe fn submit(&mut self, frame: &FrameView<'_>) -> Result<(), Self::Error>;
}

/// A backend that records the decoded entries of each submitted frame.
#[derive(Clone, Debug, Default)]
pub struct DrawLog {
    frames: Vec<Vec<RenderEntry>>,
}

impl DrawLog {
    /// Entries of every submitted frame, oldest first.
    #[must_use]
    pub fn frames(&self) -> &[Vec<RenderEntry>] {
        &self.frames
    }

    /// Entries of the most recent frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<&[RenderEntry]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Forget every recorded frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Backend for DrawLog {
    type Error = DecodeError;

    unsafe fn submit(&mut self, frame: &FrameView<'_>) -> Result<(), DecodeError> {
        let entries = frame.entries().collect::<Result<Vec<_>, _>>()?;
        self.frames.push(entries);
        Ok(())
    }
}
