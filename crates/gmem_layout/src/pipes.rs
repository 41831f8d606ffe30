//! Binning pipe assignment.
//!
//! A pipe is a rectangular block of tiles that shares one hardware
//! visibility-stream resource. The hardware pipe table has a fixed number
//! of slots, so unused trailing slots are reported as zeroed placeholders.

use gmem_protocol::{GenerationCaps, GmemBudget, PipePolicy};
use smallvec::SmallVec;

use crate::GmemLayout;

/// Inline capacity for the pipe table. Every supported generation exposes
/// at most eight physical pipe slots.
pub const MAX_PIPE_SLOTS: usize = 8;

/// Axis-aligned block of tiles, in tile-grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pipe {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Pipe {
    pub fn tile_count(&self) -> u32 {
        self.w * self.h
    }
}

/// Fixed-size hardware pipe table: always `budget.max_pipes` entries, the
/// first `used` of which cover tiles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipeTable {
    slots: SmallVec<[Pipe; MAX_PIPE_SLOTS]>,
    used: usize,
}

impl PipeTable {
    /// Number of pipes that cover tiles. At least 1 once assigned, even
    /// when the covering pipe is a zeroed placeholder for an empty grid.
    pub fn used(&self) -> usize {
        self.used
    }

    /// The full fixed-size slot table, placeholders included.
    pub fn slots(&self) -> &[Pipe] {
        &self.slots
    }

    pub fn used_pipes(&self) -> &[Pipe] {
        &self.slots[..self.used]
    }

    pub fn get(&self, index: usize) -> Option<&Pipe> {
        self.slots.get(index)
    }
}

/// Partitions the tile grid into pipes and records the chosen
/// tiles-per-pipe extents on the layout.
pub fn assign_pipes(
    layout: &mut GmemLayout,
    budget: &GmemBudget,
    caps: &GenerationCaps,
) -> PipeTable {
    let (tpp_x, tpp_y) = tiles_per_pipe(layout, budget, caps);
    layout.tpp_x = tpp_x;
    layout.tpp_y = tpp_y;

    let mut slots: SmallVec<[Pipe; MAX_PIPE_SLOTS]> = SmallVec::with_capacity(budget.max_pipes);
    let mut xoff = 0u32;
    let mut yoff = 0u32;
    while slots.len() < budget.max_pipes {
        if xoff >= layout.nbins_x {
            xoff = 0;
            yoff += tpp_y;
        }
        if yoff >= layout.nbins_y {
            break;
        }
        slots.push(Pipe {
            x: xoff,
            y: yoff,
            w: tpp_x.min(layout.nbins_x - xoff),
            h: tpp_y.min(layout.nbins_y - yoff),
        });
        xoff += tpp_x;
    }

    // at least one pipe is always reported
    let used = slots.len().max(1);
    while slots.len() < budget.max_pipes {
        slots.push(Pipe::default());
    }

    PipeTable { slots, used }
}

fn tiles_per_pipe(layout: &GmemLayout, budget: &GmemBudget, caps: &GenerationCaps) -> (u32, u32) {
    match caps.pipe_policy {
        PipePolicy::FixedGrid { tiles_x, tiles_y } => (tiles_x, tiles_y),
        PipePolicy::Adaptive => {
            let max_pipes =
                u32::try_from(budget.max_pipes).expect("pipe slot count exceeds u32 range");
            let mut tpp_x = 1u32;
            let mut tpp_y = 1u32;
            while layout.nbins_y.div_ceil(tpp_y) > max_pipes {
                tpp_y += 2;
            }
            while layout.nbins_y.div_ceil(tpp_y) * layout.nbins_x.div_ceil(tpp_x) > max_pipes {
                tpp_x += 1;
            }
            (tpp_x, tpp_y)
        }
    }
}
