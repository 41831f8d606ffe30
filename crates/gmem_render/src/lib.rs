//! Render pass orchestration over GMEM tiling.
//!
//! This crate decides whether a pass renders directly to system memory or
//! through the tiled GMEM path, and drives the hardware-mandated per-tile
//! sequence (restore, draw, resolve) through generation-specific emitter
//! callbacks. Command encoding, buffer management, and submission live
//! behind the `TileEmitter`, `CommandSink`, and `VisibilityAllocator`
//! traits.

use std::fmt;

use bitflags::bitflags;
use gmem_protocol::{BufferKinds, FramebufferDescriptor};

bitflags! {
    /// Reasons the driver recorded for why a pass must use the GMEM path
    /// even when the bypass heuristics would otherwise allow direct render.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GmemReason: u32 {
        const CLEARS_DEPTH_STENCIL = 1 << 0;
        const DEPTH_ENABLED = 1 << 1;
        const STENCIL_ENABLED = 1 << 2;
        const BLEND_ENABLED = 1 << 3;
        const LOGICOP_ENABLED = 1 << 4;
    }
}

/// Opaque cross-process synchronization token (an fd on the DRM layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncHandle(pub i32);

/// Completion fence for one pass. Unsignaled until the command buffer has
/// been flushed; a failed flush leaves it unsignaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionFence {
    state: Option<FenceState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FenceState {
    timestamp: u32,
    out_handle: Option<SyncHandle>,
}

impl CompletionFence {
    pub fn is_signaled(&self) -> bool {
        self.state.is_some()
    }

    pub fn timestamp(&self) -> Option<u32> {
        self.state.map(|state| state.timestamp)
    }

    pub fn out_handle(&self) -> Option<SyncHandle> {
        self.state.and_then(|state| state.out_handle)
    }

    pub(crate) fn populate(&mut self, timestamp: u32, out_handle: Option<SyncHandle>) {
        assert!(self.state.is_none(), "fence populated twice");
        self.state = Some(FenceState {
            timestamp,
            out_handle,
        });
    }
}

/// One recorded render pass, handed to the orchestrator for execution.
///
/// The recorded draw command stream itself is owned by the emitter; this
/// struct carries the state the scheduler needs to pick a path and drive
/// the tile loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPass {
    pub framebuffer: FramebufferDescriptor,
    pub clear: ClearState,
    pub num_draws: u32,
    pub is_blit: bool,
    /// Compute or blit-only pass with no draw framebuffer; skips both
    /// render paths and goes straight to submission.
    pub nondraw: bool,
    pub gmem_reason: GmemReason,
    /// Buffer kinds written back to system memory after each tile.
    pub resolve: BufferKinds,
    pub in_fence: Option<SyncHandle>,
    pub wants_out_fence: bool,
    pub fence: CompletionFence,
}

impl RenderPass {
    pub fn new(framebuffer: FramebufferDescriptor) -> Self {
        Self {
            framebuffer,
            clear: ClearState::default(),
            num_draws: 0,
            is_blit: false,
            nondraw: false,
            gmem_reason: GmemReason::empty(),
            resolve: BufferKinds::empty(),
            in_fence: None,
            wants_out_fence: false,
            fence: CompletionFence::default(),
        }
    }

    /// Records one draw, growing the pass scissor bound to cover it.
    pub fn record_draw(&mut self, scissor: Option<gmem_protocol::Scissor>) {
        self.num_draws += 1;
        let Some(draw) = scissor else {
            // an unscissored draw unbounds the pass
            self.framebuffer.scissor = None;
            return;
        };
        if let Some(bound) = &mut self.framebuffer.scissor {
            bound.expand_to_include(&draw);
        } else {
            self.framebuffer.scissor = Some(draw);
        }
    }
}

/// Pass-lifetime counters, matching what the driver layer historically
/// tracked for its HUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub batch_total: u64,
    pub batch_sysmem: u64,
    pub batch_gmem: u64,
    pub batch_nondraw: u64,
    pub batch_restore: u64,
}

/// Orchestrator progress through one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassPhase {
    #[default]
    Idle,
    DirectRender,
    TiledRender,
    Submitted,
    Fenced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    OutOfMemory,
    DeviceLost,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::OutOfMemory => {
                write!(formatter, "visibility stream allocation out of memory")
            }
            ResourceError::DeviceLost => write!(formatter, "device lost during allocation"),
        }
    }
}

impl std::error::Error for ResourceError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionError {
    FlushFailed,
    DeviceLost,
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::FlushFailed => write!(formatter, "command buffer flush failed"),
            SubmissionError::DeviceLost => write!(formatter, "device lost during submission"),
        }
    }
}

impl std::error::Error for SubmissionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// Pipe or per-tile buffer allocation failed; the pass was aborted
    /// before any command emission.
    Resource(ResourceError),
    /// Flush failed at the kernel boundary; the fence stays unsignaled.
    Submission(SubmissionError),
}

impl From<ResourceError> for RenderError {
    fn from(value: ResourceError) -> Self {
        Self::Resource(value)
    }
}

impl From<SubmissionError> for RenderError {
    fn from(value: SubmissionError) -> Self {
        Self::Submission(value)
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Resource(error) => write!(formatter, "pass aborted: {error}"),
            RenderError::Submission(error) => write!(formatter, "pass submission failed: {error}"),
        }
    }
}

impl std::error::Error for RenderError {}

mod emitter;
mod orchestrator;
mod restore;

pub use emitter::{CommandSink, PipeResourcePool, Submission, TileEmitter, VisibilityAllocator};
pub use orchestrator::{OrchestratorConfig, RenderOrchestrator};
pub use restore::{ClearState, needs_restore};
