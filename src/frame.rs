//! Frame driver support: the long-lived backing memory of the command
//! buffer and the build, submit, reset cycle.
//!
//! [`FrameMemory`] allocates the command arena and both vertex pools once,
//! at startup, from an [`Allocator`]. Each frame borrows them as a fresh
//! [`RenderCommands`] with every cursor at zero, so the reset between frames
//! happens by construction.

use crate::allocator::Allocator;
use crate::array::Array;
use crate::backend::Backend;
use crate::command::{FrameView, RenderCommands, RenderSettings};
use crate::config::FrameBudget;
use crate::types::{TexturedVertex, Vertex};

/// Counters describing one finished frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Number of records in the command arena.
    pub commands: usize,
    /// Bytes of the command arena in use.
    pub command_bytes: usize,
    /// Untextured vertices in use.
    pub vertices: usize,
    /// Textured vertices in use.
    pub textured_vertices: usize,
}

impl FrameStats {
    /// Measure a finished frame.
    #[must_use]
    pub fn of(frame: &FrameView<'_>) -> Self {
        Self {
            commands: frame.entries().filter(Result::is_ok).count(),
            command_bytes: frame.command_bytes().len(),
            vertices: frame.vertices().len(),
            textured_vertices: frame.textured_vertices().len(),
        }
    }
}

/// The command arena and vertex pools, allocated once for the program.
pub struct FrameMemory {
    arena: Array<u8>,
    vertices: Array<Vertex>,
    textured: Array<TexturedVertex>,
}

impl FrameMemory {
    /// Allocate buffers sized by `budget` from `allocator`.
    ///
    /// # Panics
    ///
    /// Aborts if `allocator` cannot supply the memory.
    #[must_use]
    pub fn new(budget: &FrameBudget, allocator: &Allocator) -> Self {
        tracing::debug!(
            command_bytes = budget.command_bytes,
            vertices = budget.vertices,
            textured_vertices = budget.textured_vertices,
            "allocating frame memory"
        );
        Self {
            arena: Array::filled(allocator.clone(), budget.command_bytes, 0),
            vertices: Array::filled(allocator.clone(), budget.vertices, Vertex::default()),
            textured: Array::filled(
                allocator.clone(),
                budget.textured_vertices,
                TexturedVertex::default(),
            ),
        }
    }

    /// Capacities of the backing buffers.
    #[must_use]
    pub fn budget(&self) -> FrameBudget {
        FrameBudget {
            command_bytes: self.arena.len(),
            vertices: self.vertices.len(),
            textured_vertices: self.textured.len(),
        }
    }

    /// Start a frame: hand out the buffers with every cursor at zero.
    pub fn begin<'a>(&'a mut self, settings: RenderSettings<'a>) -> RenderCommands<'a> {
        RenderCommands::new(
            &mut self.arena,
            &mut self.vertices,
            &mut self.textured,
            settings,
        )
    }

    /// Build a frame with `build`, submit it to `backend`, and report what
    /// was drawn.
    ///
    /// # Safety
    ///
    /// Whatever [`Backend::submit`] requires of `backend`, such as a current
    /// GL context.
    ///
    /// # Errors
    ///
    /// Propagates the backend's error. The frame is discarded either way.
    pub unsafe fn run_frame<B: Backend>(
        &mut self,
        settings: RenderSettings<'_>,
        backend: &mut B,
        build: impl FnOnce(&mut RenderCommands<'_>),
    ) -> Result<FrameStats, B::Error> {
        let mut commands = self.begin(settings);
        build(&mut commands);

        let view = commands.view();
        let stats = FrameStats::of(&view);
        tracing::trace!(
            commands = stats.commands,
            command_bytes = stats.command_bytes,
            vertices = stats.vertices,
            textured_vertices = stats.textured_vertices,
            "submitting frame"
        );
        unsafe { backend.submit(&view)? };
        Ok(stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::DrawLog;
    use crate::command::{QuadKind, RenderEntry};
    use crate::types::{Color, Rgba, Vec2};

    fn small_budget() -> FrameBudget {
        FrameBudget {
            command_bytes: 256,
            vertices: 60,
            textured_vertices: 60,
        }
    }

    #[test]
    fn budget_round_trips_through_memory() {
        let memory = FrameMemory::new(&small_budget(), &Allocator::heap());
        assert_eq!(memory.budget(), small_budget());
    }

    #[test]
    fn frames_start_empty() {
        let mut memory = FrameMemory::new(&small_budget(), &Allocator::arena(4096));
        {
            let mut cmds = memory.begin(RenderSettings::new(10, 10));
            cmds.push_clear(Rgba::WHITE);
            assert_eq!(cmds.command_bytes(), 20);
        }
        let cmds = memory.begin(RenderSettings::new(10, 10));
        assert_eq!(cmds.command_bytes(), 0);
        assert_eq!(cmds.view().entries().count(), 0);
    }

    #[test]
    fn run_frame_submits_and_counts() {
        let mut memory = FrameMemory::new(&small_budget(), &Allocator::heap());
        let mut log = DrawLog::default();
        let stats = unsafe {
            memory.run_frame(RenderSettings::new(10, 10), &mut log, |cmds| {
                cmds.push_clear(Rgba::WHITE);
                cmds.push_rect(Vec2::ZERO, Vec2::new(2.0, 2.0), QuadKind::Normal, Color::WHITE);
            })
        }
        .unwrap();
        assert_eq!(
            stats,
            FrameStats {
                commands: 2,
                command_bytes: 36,
                vertices: 6,
                textured_vertices: 0
            }
        );
        assert_eq!(log.frames().len(), 1);
        assert!(matches!(log.frames()[0][1], RenderEntry::Quads { quad_count: 1, .. }));
    }
}
