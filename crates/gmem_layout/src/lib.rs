//! Tile grid planning for GMEM rendering.
//!
//! Render targets larger than the on-chip tile buffer are split into bins
//! small enough for every enabled buffer (color, and depth and/or stencil)
//! to fit at once. This crate computes that split: `plan` runs the bin
//! geometry search, `assign_pipes` groups the grid into hardware binning
//! pipes, and `assign_tiles` walks the grid in raster order. `RenderGeometry`
//! caches all three, recomputing only when the inputs change.

use gmem_protocol::{
    DebugFlags, FramebufferDescriptor, GenerationCaps, GmemBudget, MAX_RENDER_TARGETS,
};

/// Planned GMEM layout for one combination of buffer sizes and render area.
///
/// The buffer sizes it was computed from are kept alongside the result:
/// planning is a pure function of those inputs plus the effective area, so
/// recomputation is skipped whenever they match the previous pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmemLayout {
    pub bin_w: u32,
    pub bin_h: u32,
    pub nbins_x: u32,
    pub nbins_y: u32,
    /// Origin of the effective render area, aligned down to the bin grid.
    pub minx: u32,
    pub miny: u32,
    pub width: u32,
    pub height: u32,
    /// Tiles per pipe in each axis, set by pipe assignment.
    pub tpp_x: u32,
    pub tpp_y: u32,
    /// GMEM base offset per color buffer slot.
    pub cbuf_base: [u32; MAX_RENDER_TARGETS],
    /// GMEM base offsets for the depth and stencil planes.
    pub zsbuf_base: [u32; 2],
    cbuf_cpp: [u8; MAX_RENDER_TARGETS],
    zsbuf_cpp: [u8; 2],
}

impl GmemLayout {
    pub fn tile_count(&self) -> usize {
        self.nbins_x as usize * self.nbins_y as usize
    }

    /// Bytes per tile pixel for each color slot, including the MSAA factor.
    pub fn cbuf_cpp(&self) -> &[u8; MAX_RENDER_TARGETS] {
        &self.cbuf_cpp
    }

    /// Bytes per tile pixel for the depth and stencil planes.
    pub fn zsbuf_cpp(&self) -> &[u8; 2] {
        &self.zsbuf_cpp
    }

    fn inputs_match(
        &self,
        cbuf_cpp: &[u8; MAX_RENDER_TARGETS],
        zsbuf_cpp: &[u8; 2],
        area: (u32, u32, u32, u32),
    ) -> bool {
        self.cbuf_cpp == *cbuf_cpp
            && self.zsbuf_cpp == *zsbuf_cpp
            && (self.minx, self.miny, self.width, self.height) == area
    }
}

/// Layout, pipe table, and tile list for the current pass inputs.
///
/// Owned by the per-context render state; mutated only between passes and
/// read-only during tile traversal.
#[derive(Debug, Default)]
pub struct RenderGeometry {
    layout: Option<GmemLayout>,
    pipes: PipeTable,
    tiles: Vec<Tile>,
}

impl RenderGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes layout, pipes, and tiles unless the buffer sizes and
    /// effective render area are identical to the previous computation.
    /// Returns whether a relayout happened, so callers can invalidate
    /// per-pipe resources.
    pub fn refresh(
        &mut self,
        fb: &FramebufferDescriptor,
        budget: &GmemBudget,
        caps: &GenerationCaps,
        debug: DebugFlags,
    ) -> bool {
        let (cbuf_cpp, zsbuf_cpp) = planner::tile_pixel_sizes(fb);
        let area = planner::effective_area(fb, budget, debug);
        if let Some(layout) = &self.layout {
            if layout.inputs_match(&cbuf_cpp, &zsbuf_cpp, area) {
                return false;
            }
        }

        let mut layout = planner::plan_with_sizes(fb, budget, debug, cbuf_cpp, zsbuf_cpp);
        self.pipes = pipes::assign_pipes(&mut layout, budget, caps);
        self.tiles = tiles::assign_tiles(&layout, &self.pipes, caps);
        self.layout = Some(layout);
        true
    }

    pub fn layout(&self) -> Option<&GmemLayout> {
        self.layout.as_ref()
    }

    pub fn pipes(&self) -> &PipeTable {
        &self.pipes
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }
}

mod planner;
mod pipes;
mod tiles;

pub use planner::plan;
pub use pipes::{MAX_PIPE_SLOTS, Pipe, PipeTable, assign_pipes};
pub use tiles::{Tile, assign_tiles};
