//! Restore decisions for the tiled path.
//!
//! Before drawing a tile, any buffer whose prior contents are still needed
//! must be restored from system memory into GMEM. Clears invalidate that
//! need: a full clear drops the restore mark entirely, and a partial
//! (scissored) clear lets tiles fully inside the cleared rectangle skip
//! the restore.

use gmem_layout::Tile;
use gmem_protocol::{BufferKinds, Scissor};

/// Clear and restore bookkeeping for one pass.
///
/// Only the most recent clear scissor per buffer kind is kept; multiple
/// partial clears collapse to the last one. The common case is a single
/// clear, and the collapse only costs unnecessary restores, never stale
/// data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearState {
    restore: BufferKinds,
    cleared: BufferKinds,
    partial_cleared: BufferKinds,
    color_scissor: Option<Scissor>,
    depth_scissor: Option<Scissor>,
    stencil_scissor: Option<Scissor>,
}

impl ClearState {
    /// Called by the draw pass when a draw reads or blends against prior
    /// contents of `kinds`.
    pub fn mark_restore(&mut self, kinds: BufferKinds) {
        self.restore |= kinds;
    }

    /// Records a clear of `kinds`. A full-surface clear (`scissor: None`)
    /// invalidates prior contents, so it drops restore marks and any
    /// partial state; a scissored clear records the rectangle last-wins.
    pub fn record_clear(&mut self, kinds: BufferKinds, scissor: Option<Scissor>) {
        self.cleared |= kinds;
        match scissor {
            None => {
                self.restore -= kinds;
                self.partial_cleared -= kinds;
            }
            Some(rect) => {
                self.partial_cleared |= kinds;
                if kinds.contains(BufferKinds::COLOR) {
                    self.color_scissor = Some(rect);
                }
                if kinds.contains(BufferKinds::DEPTH) {
                    self.depth_scissor = Some(rect);
                }
                if kinds.contains(BufferKinds::STENCIL) {
                    self.stencil_scissor = Some(rect);
                }
            }
        }
    }

    pub fn restore_mask(&self) -> BufferKinds {
        self.restore
    }

    pub fn cleared(&self) -> BufferKinds {
        self.cleared
    }

    pub fn partial_cleared(&self) -> BufferKinds {
        self.partial_cleared
    }

    fn clear_scissor(&self, kind: BufferKinds) -> Option<Scissor> {
        if kind == BufferKinds::COLOR {
            self.color_scissor
        } else if kind == BufferKinds::DEPTH {
            self.depth_scissor
        } else if kind == BufferKinds::STENCIL {
            self.stencil_scissor
        } else {
            None
        }
    }
}

/// Whether `tile` must be restored from system memory before drawing, for
/// any of the queried buffer kinds.
///
/// A tile skips the restore when the kind was never marked, or when the
/// kind was partially cleared and the tile lies fully inside the recorded
/// clear scissor (the clear already wrote correct data there).
pub fn needs_restore(clear: &ClearState, tile: &Tile, kinds: BufferKinds) -> bool {
    if !clear.restore_mask().intersects(kinds) {
        return false;
    }

    for kind in [BufferKinds::COLOR, BufferKinds::DEPTH, BufferKinds::STENCIL] {
        if !kinds.contains(kind) || !clear.partial_cleared().contains(kind) {
            continue;
        }
        if let Some(scissor) = clear.clear_scissor(kind) {
            if scissor.contains_rect(tile.xoff, tile.yoff, tile.bin_w, tile.bin_h) {
                return false;
            }
        }
    }

    true
}
