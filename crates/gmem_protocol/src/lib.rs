//! Shared data model for GMEM tiling.
//!
//! This crate defines the inputs every other crate agrees on: scissor
//! rectangles, buffer-kind masks, the per-pass framebuffer descriptor, the
//! per-device GMEM budget, generation capabilities, and debug overrides.

use bitflags::bitflags;

/// Maximum number of simultaneously bound color render targets.
pub const MAX_RENDER_TARGETS: usize = 8;

bitflags! {
    /// Buffer kinds that live in GMEM while a tile is being rendered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BufferKinds: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

bitflags! {
    /// Environment-driven overrides. These change which path is taken or
    /// what the planner considers, never the algorithmic contract.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugFlags: u32 {
        /// Ignore the draw scissor and always tile the full framebuffer.
        const NO_SCISSOR = 1 << 0;
        /// Never take the direct-render bypass path.
        const NO_BYPASS = 1 << 1;
        /// Always take the direct-render path, even when tiling would win.
        const FORCE_BYPASS = 1 << 2;
        /// Suppress mem2gmem restores (renders with stale tile contents).
        const NO_RESTORE = 1 << 3;
        /// Print planning and path-selection diagnostics.
        const MSGS = 1 << 4;
    }
}

impl DebugFlags {
    /// Parses the `GMEM_DEBUG` environment variable as a comma-separated
    /// flag list. Unknown names are reported and skipped.
    pub fn from_env() -> Self {
        let Ok(value) = std::env::var("GMEM_DEBUG") else {
            return DebugFlags::empty();
        };
        let mut flags = DebugFlags::empty();
        for name in value.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            match name {
                "noscis" => flags |= DebugFlags::NO_SCISSOR,
                "nobypass" => flags |= DebugFlags::NO_BYPASS,
                "forcebypass" => flags |= DebugFlags::FORCE_BYPASS,
                "norestore" => flags |= DebugFlags::NO_RESTORE,
                "msgs" => flags |= DebugFlags::MSGS,
                other => eprintln!("[gmem] unknown GMEM_DEBUG flag: {other}"),
            }
        }
        flags
    }
}

/// Pixel-space scissor rectangle, max-exclusive on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scissor {
    pub minx: u32,
    pub miny: u32,
    pub maxx: u32,
    pub maxy: u32,
}

impl Scissor {
    pub const fn new(minx: u32, miny: u32, maxx: u32, maxy: u32) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    pub const fn width(&self) -> u32 {
        self.maxx.saturating_sub(self.minx)
    }

    pub const fn height(&self) -> u32 {
        self.maxy.saturating_sub(self.miny)
    }

    /// True when the rectangle at `(x, y)` with extent `w`x`h` lies fully
    /// inside this scissor.
    pub const fn contains_rect(&self, x: u32, y: u32, w: u32, h: u32) -> bool {
        x >= self.minx && x + w <= self.maxx && y >= self.miny && y + h <= self.maxy
    }

    /// Grows this scissor to cover `other`. Used to accumulate the bound
    /// of all draws recorded into a pass.
    pub fn expand_to_include(&mut self, other: &Scissor) {
        self.minx = self.minx.min(other.minx);
        self.miny = self.miny.min(other.miny);
        self.maxx = self.maxx.max(other.maxx);
        self.maxy = self.maxy.max(other.maxy);
    }
}

/// Immutable description of a render pass target, captured when the pass
/// begins. `scissor` bounds all draws in the pass; `None` means unbounded
/// (the whole framebuffer is considered drawn).
///
/// All pixel sizes are bytes per sample-pixel; a zero entry means the slot
/// is unused. Color buffers are supersampled in GMEM under MSAA, so the
/// planner multiplies color sizes by `samples`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferDescriptor {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub color_cpp: [u8; MAX_RENDER_TARGETS],
    pub depth_cpp: u8,
    pub stencil_cpp: u8,
    pub scissor: Option<Scissor>,
}

impl FramebufferDescriptor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            samples: 1,
            color_cpp: [0; MAX_RENDER_TARGETS],
            depth_cpp: 0,
            stencil_cpp: 0,
            scissor: None,
        }
    }

    pub fn has_attachments(&self) -> bool {
        self.depth_cpp != 0
            || self.stencil_cpp != 0
            || self.color_cpp.iter().any(|&cpp| cpp != 0)
    }

    /// Buffer kinds that have backing storage in this pass.
    pub fn enabled_kinds(&self) -> BufferKinds {
        let mut kinds = BufferKinds::empty();
        if self.color_cpp.iter().any(|&cpp| cpp != 0) {
            kinds |= BufferKinds::COLOR;
        }
        if self.depth_cpp != 0 {
            kinds |= BufferKinds::DEPTH;
        }
        if self.stencil_cpp != 0 {
            kinds |= BufferKinds::STENCIL;
        }
        kinds
    }
}

/// On-chip memory budget and hardware limits, derived from queried device
/// capabilities once per device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GmemBudget {
    /// Total on-chip tile buffer size in bytes.
    pub total_bytes: u32,
    /// Required alignment of bin width, in pixels. Power of two.
    pub align_w: u32,
    /// Required alignment of bin height, in pixels. Power of two.
    pub align_h: u32,
    /// Widest bin the generation supports.
    pub max_bin_width: u32,
    /// Number of physical binning pipe slots.
    pub max_pipes: usize,
}

impl GmemBudget {
    /// Bin width cap on the oldest, software-binning device class.
    pub const MAX_BIN_WIDTH_LEGACY: u32 = 512;
    /// Bin width cap on the first hardware-binning class.
    pub const MAX_BIN_WIDTH_BINNING: u32 = 992;
    /// Bin width cap on later classes.
    pub const MAX_BIN_WIDTH_WIDE: u32 = 1024;

    /// Budget with the 32-pixel bin alignment and 8 pipe slots every
    /// supported class shares. The tile buffer size is queried from the
    /// kernel per device.
    pub const fn for_class(total_bytes: u32, max_bin_width: u32) -> Self {
        Self {
            total_bytes,
            align_w: 32,
            align_h: 32,
            max_bin_width,
            max_pipes: 8,
        }
    }

    /// Contract check for values handed in from the device layer. The
    /// planner relies on power-of-two alignments for scissor rounding.
    pub fn validate(&self) {
        assert!(self.total_bytes > 0, "GMEM budget must be nonzero");
        assert!(
            self.align_w.is_power_of_two() && self.align_h.is_power_of_two(),
            "bin alignment must be a power of two"
        );
        assert!(
            self.max_bin_width >= self.align_w,
            "max bin width {} below alignment {}",
            self.max_bin_width,
            self.align_w
        );
        assert!(self.max_pipes >= 1, "at least one pipe slot is required");
    }
}

/// How the tile grid is grouped into binning pipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipePolicy {
    /// Pipe extent is fixed regardless of layout, to match a fixed-width
    /// hardware binning counter. The edge rows/columns of the 8x8 binning
    /// grid are reserved for off-screen culling, hence 6x6.
    FixedGrid { tiles_x: u32, tiles_y: u32 },
    /// Grow tiles-per-pipe until the grid fits the physical pipe slots.
    Adaptive,
}

/// How a tile's sequence number inside its pipe is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSequencing {
    /// Monotonic per-pipe counter, contiguous from zero.
    PerPipeCounter,
    /// Packed `(row_in_pipe + 1) << 3 | (col_in_pipe + 1)` bitfield, used
    /// to patch binning-visibility command streams on the oldest parts.
    PackedRowCol,
}

/// Per-generation behavior switches, selected once at context creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationCaps {
    pub pipe_policy: PipePolicy,
    pub sequencing: TileSequencing,
}

impl GenerationCaps {
    /// Oldest generation: fixed 6x6 tiles per pipe, packed sequencing.
    pub const fn fixed_grid() -> Self {
        Self {
            pipe_policy: PipePolicy::FixedGrid {
                tiles_x: 6,
                tiles_y: 6,
            },
            sequencing: TileSequencing::PackedRowCol,
        }
    }

    /// Newer generations: adaptive tiles-per-pipe, counter sequencing.
    pub const fn adaptive() -> Self {
        Self {
            pipe_policy: PipePolicy::Adaptive,
            sequencing: TileSequencing::PerPipeCounter,
        }
    }
}

#[cfg(test)]
mod tests;
