//! End-to-end pass execution.
//!
//! A pass either renders directly to system memory (small passes with no
//! clears and no GMEM-forcing state) or through the tiled path: refresh
//! layout, allocate pipe visibility resources, then run the per-tile
//! restore/draw/resolve sequence. Both paths converge on a single command
//! buffer flush that populates the pass fence.

use gmem_layout::RenderGeometry;
use gmem_protocol::{BufferKinds, DebugFlags, GenerationCaps, GmemBudget};

use crate::emitter::{CommandSink, PipeResourcePool, TileEmitter, VisibilityAllocator};
use crate::restore::needs_restore;
use crate::{PassPhase, RenderError, RenderPass, RenderStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Passes with at most this many draws bypass tiling (unless a blit).
    pub bypass_draw_threshold: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bypass_draw_threshold: 5,
        }
    }
}

/// Per-context render scheduler. Owns the cached tile geometry and the
/// pipe visibility-stream pool; not reentrant, one pass at a time.
pub struct RenderOrchestrator<A: VisibilityAllocator> {
    budget: GmemBudget,
    caps: GenerationCaps,
    debug: DebugFlags,
    config: OrchestratorConfig,
    allocator: A,
    geometry: RenderGeometry,
    visibility: PipeResourcePool<A::Handle>,
    stats: RenderStats,
    phase: PassPhase,
}

impl<A: VisibilityAllocator> RenderOrchestrator<A> {
    pub fn new(budget: GmemBudget, caps: GenerationCaps, allocator: A) -> Self {
        budget.validate();
        Self {
            budget,
            caps,
            debug: DebugFlags::from_env(),
            config: OrchestratorConfig::default(),
            allocator,
            geometry: RenderGeometry::new(),
            visibility: PipeResourcePool::new(budget.max_pipes),
            stats: RenderStats::default(),
            phase: PassPhase::Idle,
        }
    }

    pub fn with_debug_flags(mut self, debug: DebugFlags) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn phase(&self) -> PassPhase {
        self.phase
    }

    pub fn geometry(&self) -> &RenderGeometry {
        &self.geometry
    }

    pub fn visibility(&self) -> &PipeResourcePool<A::Handle> {
        &self.visibility
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Executes one pass to completion: path selection, command emission
    /// through `emitter`, and a final flush through `sink` that populates
    /// the pass fence. A flush failure is fatal to the pass and leaves the
    /// fence unsignaled; there is no partial-submission retry.
    pub fn run<E, S>(
        &mut self,
        pass: &mut RenderPass,
        emitter: &mut E,
        sink: &mut S,
    ) -> Result<(), RenderError>
    where
        E: TileEmitter,
        S: CommandSink,
    {
        self.phase = PassPhase::Idle;
        self.stats.batch_total += 1;

        if pass.nondraw {
            // no draw framebuffer; the recorded stream is flushed as-is
            self.phase = PassPhase::DirectRender;
            self.stats.batch_nondraw += 1;
        } else if self.use_direct_render(pass) {
            self.phase = PassPhase::DirectRender;
            if self.debug.contains(DebugFlags::MSGS) {
                eprintln!(
                    "[gmem] rendering sysmem {}x{}",
                    pass.framebuffer.width, pass.framebuffer.height
                );
            }
            self.render_sysmem(pass, emitter);
            self.stats.batch_sysmem += 1;
        } else {
            self.phase = PassPhase::TiledRender;
            self.prepare_tiled(pass)?;
            self.render_tiles(pass, emitter);
            self.stats.batch_gmem += 1;
        }

        self.phase = PassPhase::Submitted;
        let submission = sink.flush(pass.in_fence, pass.wants_out_fence)?;
        pass.fence
            .populate(submission.timestamp, submission.out_fence);
        self.phase = PassPhase::Fenced;
        Ok(())
    }

    fn use_direct_render(&self, pass: &RenderPass) -> bool {
        let fb = &pass.framebuffer;

        // nothing to place in GMEM for a pure side-effect pass
        if !fb.has_attachments() {
            return true;
        }
        if self.debug.contains(DebugFlags::FORCE_BYPASS) {
            return true;
        }

        if !pass.clear.cleared().is_empty()
            || !pass.gmem_reason.is_empty()
            || (pass.num_draws > self.config.bypass_draw_threshold && !pass.is_blit)
            || fb.samples > 1
        {
            if self.debug.contains(DebugFlags::MSGS) {
                eprintln!(
                    "[gmem] gmem path: cleared={:?}, reason={:?}, draws={}, samples={}",
                    pass.clear.cleared(),
                    pass.gmem_reason,
                    pass.num_draws,
                    fb.samples
                );
            }
            return false;
        }

        !self.debug.contains(DebugFlags::NO_BYPASS)
    }

    /// Layout refresh plus pipe resource allocation. Runs before any
    /// command emission so an allocation failure aborts the pass cleanly.
    fn prepare_tiled(&mut self, pass: &RenderPass) -> Result<(), RenderError> {
        let relayout =
            self.geometry
                .refresh(&pass.framebuffer, &self.budget, &self.caps, self.debug);
        if relayout {
            self.visibility.invalidate();
        }

        for (slot, pipe) in self.geometry.pipes().used_pipes().iter().enumerate() {
            self.visibility.ensure(slot, &mut self.allocator, pipe)?;
        }
        Ok(())
    }

    fn render_tiles<E: TileEmitter>(&mut self, pass: &RenderPass, emitter: &mut E) {
        let geometry = &self.geometry;
        let tiles = geometry.tiles();

        if self.debug.contains(DebugFlags::MSGS) {
            let layout = geometry.layout().expect("tiled path requires a layout");
            eprintln!(
                "[gmem] rendering {}x{} tiles of {}x{}",
                layout.nbins_x, layout.nbins_y, layout.bin_w, layout.bin_h
            );
        }

        emitter.prepare_queries(pass, tiles.len() as u32);
        emitter.emit_tile_init(pass, geometry);

        if !pass.clear.restore_mask().is_empty() {
            self.stats.batch_restore += 1;
        }

        let enabled = pass.framebuffer.enabled_kinds();
        let suppress_restore = self.debug.contains(DebugFlags::NO_RESTORE);
        for (index, tile) in tiles.iter().enumerate() {
            emitter.emit_tile_prep(pass, tile);
            // queried per kind: a partial clear covering one kind must not
            // suppress another kind's restore
            let restore = [BufferKinds::COLOR, BufferKinds::DEPTH, BufferKinds::STENCIL]
                .into_iter()
                .any(|kind| enabled.contains(kind) && needs_restore(&pass.clear, tile, kind));
            if !suppress_restore && restore {
                emitter.emit_tile_mem2gmem(pass, tile);
            }
            emitter.emit_tile_renderprep(pass, tile);
            emitter.prepare_tile_queries(pass, index as u32);
            emitter.emit_command_buffer(pass);
            emitter.emit_tile_gmem2mem(pass, tile);
        }

        emitter.emit_tile_fini(pass);
    }

    fn render_sysmem<E: TileEmitter>(&mut self, pass: &RenderPass, emitter: &mut E) {
        emitter.prepare_queries(pass, 1);
        emitter.emit_sysmem_prep(pass);
        emitter.prepare_tile_queries(pass, 0);
        emitter.emit_command_buffer(pass);
        emitter.emit_sysmem_fini(pass);
    }
}
