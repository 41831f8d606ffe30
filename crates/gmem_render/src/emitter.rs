//! Collaborator contracts for generation-specific command emission.

use gmem_layout::{MAX_PIPE_SLOTS, Pipe, RenderGeometry, Tile};
use smallvec::SmallVec;

use crate::{RenderPass, ResourceError, SubmissionError, SyncHandle};

/// Per-generation command-stream emission callbacks. The orchestrator
/// guarantees the tiled-path call order: `emit_tile_init` once, then for
/// every tile in raster order `emit_tile_prep`, `emit_tile_mem2gmem` (only
/// when a restore is needed), `emit_tile_renderprep`, `emit_command_buffer`,
/// `emit_tile_gmem2mem`, and finally `emit_tile_fini`.
pub trait TileEmitter {
    /// One-time GMEM geometry setup. Hardware-binning generations patch
    /// recorded draw-command placeholders with final per-pipe metadata here
    /// and issue the binning pass through a sub-command-buffer.
    fn emit_tile_init(&mut self, pass: &RenderPass, geometry: &RenderGeometry);

    /// Per-tile screen-scissor setup.
    fn emit_tile_prep(&mut self, pass: &RenderPass, tile: &Tile);

    /// System memory to GMEM transfer for the buffers this tile restores.
    fn emit_tile_mem2gmem(&mut self, pass: &RenderPass, tile: &Tile);

    /// Per-tile window-scissor/offset setup, and the visibility-stream
    /// pointer for this tile's pipe on hardware-binning generations.
    fn emit_tile_renderprep(&mut self, pass: &RenderPass, tile: &Tile);

    /// GMEM to system memory resolve for the pass's resolve set.
    fn emit_tile_gmem2mem(&mut self, pass: &RenderPass, tile: &Tile);

    fn emit_tile_fini(&mut self, _pass: &RenderPass) {}

    /// Whole-framebuffer setup for the direct path.
    fn emit_sysmem_prep(&mut self, pass: &RenderPass);

    fn emit_sysmem_fini(&mut self, _pass: &RenderPass) {}

    /// Replays the pass's recorded draw commands into the destination
    /// stream (once per tile on the tiled path, once on the direct path).
    fn emit_command_buffer(&mut self, pass: &RenderPass);

    /// Hardware query bookkeeping before rendering starts.
    fn prepare_queries(&mut self, _pass: &RenderPass, _tile_count: u32) {}

    fn prepare_tile_queries(&mut self, _pass: &RenderPass, _tile_index: u32) {}
}

/// Submission boundary. Flushing hands the accumulated command buffer to
/// the kernel; the hardware may wait on `in_fence` before executing, and
/// the caller may request an exported sync handle for external waiters.
pub trait CommandSink {
    fn flush(
        &mut self,
        in_fence: Option<SyncHandle>,
        want_out_fence: bool,
    ) -> Result<Submission, SubmissionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub timestamp: u32,
    pub out_fence: Option<SyncHandle>,
}

/// Allocates the binning visibility-stream backing for one pipe. Sizing
/// is the device layer's concern; it sees the pipe's tile extent.
pub trait VisibilityAllocator {
    type Handle;

    fn allocate(&mut self, pipe: &Pipe) -> Result<Self::Handle, ResourceError>;
}

/// Visibility-stream handles per pipe slot, allocated on first use and
/// reused across passes until a relayout invalidates the sizing.
#[derive(Debug)]
pub struct PipeResourcePool<H> {
    handles: SmallVec<[Option<H>; MAX_PIPE_SLOTS]>,
}

impl<H> PipeResourcePool<H> {
    pub fn new(max_pipes: usize) -> Self {
        Self {
            handles: (0..max_pipes).map(|_| None).collect(),
        }
    }

    pub fn invalidate(&mut self) {
        for slot in &mut self.handles {
            *slot = None;
        }
    }

    pub fn ensure<A>(
        &mut self,
        slot: usize,
        allocator: &mut A,
        pipe: &Pipe,
    ) -> Result<&H, ResourceError>
    where
        A: VisibilityAllocator<Handle = H>,
    {
        let entry = self
            .handles
            .get_mut(slot)
            .unwrap_or_else(|| panic!("pipe slot {slot} outside the hardware pipe table"));
        if entry.is_none() {
            *entry = Some(allocator.allocate(pipe)?);
        }
        Ok(entry.as_ref().expect("pipe slot populated above"))
    }

    pub fn get(&self, slot: usize) -> Option<&H> {
        self.handles.get(slot).and_then(|entry| entry.as_ref())
    }
}
