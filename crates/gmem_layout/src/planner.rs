//! Bin geometry search.
//!
//! Starting from the narrowest legal bin, the search widens the bin one
//! alignment step at a time; at each width it shrinks the bin height until
//! every enabled buffer fits the GMEM budget, then scores the candidate.
//! Best candidate is the one with the fewest bins, tie-broken toward a
//! near-square grid (smallest `nbins_x + nbins_y`), which keeps pipe
//! assignment overhead down.

use gmem_protocol::{DebugFlags, FramebufferDescriptor, GmemBudget, MAX_RENDER_TARGETS};
use static_assertions::const_assert;

use crate::GmemLayout;

/// Per-buffer GMEM base offsets are aligned to hardware bank granularity.
pub(crate) const GMEM_BASE_ALIGN: u32 = 0x4000;

const_assert!(GMEM_BASE_ALIGN.is_power_of_two());

/// Computes the tile grid and per-buffer GMEM base offsets for one pass.
pub fn plan(fb: &FramebufferDescriptor, budget: &GmemBudget, debug: DebugFlags) -> GmemLayout {
    let (cbuf_cpp, zsbuf_cpp) = tile_pixel_sizes(fb);
    plan_with_sizes(fb, budget, debug, cbuf_cpp, zsbuf_cpp)
}

/// Bytes each buffer occupies per tile pixel. Color buffers are
/// supersampled in GMEM under MSAA; depth and stencil are separate planes.
pub(crate) fn tile_pixel_sizes(
    fb: &FramebufferDescriptor,
) -> ([u8; MAX_RENDER_TARGETS], [u8; 2]) {
    let samples = u8::try_from(fb.samples.max(1)).expect("sample count exceeds u8 range");
    let mut cbuf_cpp = [0u8; MAX_RENDER_TARGETS];
    for (slot, &cpp) in fb.color_cpp.iter().enumerate() {
        if cpp == 0 {
            continue;
        }
        cbuf_cpp[slot] = cpp
            .checked_mul(samples)
            .expect("color bytes per tile pixel overflow");
    }
    (cbuf_cpp, [fb.depth_cpp, fb.stencil_cpp])
}

pub(crate) fn plan_with_sizes(
    fb: &FramebufferDescriptor,
    budget: &GmemBudget,
    debug: DebugFlags,
    cbuf_cpp: [u8; MAX_RENDER_TARGETS],
    zsbuf_cpp: [u8; 2],
) -> GmemLayout {
    budget.validate();

    let (minx, miny, width, height) = effective_area(fb, budget, debug);
    assert!(
        width > 0 && height > 0,
        "render pass has zero effective tile area"
    );

    if debug.contains(DebugFlags::MSGS) {
        eprintln!(
            "[gmem] binning input: cbuf cpp {:?}, zsbuf cpp {:?}, area {}x{}",
            cbuf_cpp, zsbuf_cpp, width, height
        );
    }

    let mut cbuf_base = [0u32; MAX_RENDER_TARGETS];
    let mut zsbuf_base = [0u32; 2];

    let mut bw = budget.align_w;
    let mut nbx = width.div_ceil(bw);
    let mut margin_x = i64::from(bw) * i64::from(nbx) - i64::from(width);

    let mut bh = height.next_multiple_of(budget.align_h);
    let mut nby = 1u32;
    let mut margin_y = i64::from(bh) - i64::from(height);

    let mut best: Option<Candidate> = None;
    while bw <= budget.max_bin_width {
        while total_size(&cbuf_cpp, &zsbuf_cpp, bw, bh, &mut cbuf_base, &mut zsbuf_base)
            > u64::from(budget.total_bytes)
        {
            margin_y = step_bin_down(margin_y, &mut bh, &mut nby, budget.align_h);
        }

        let candidate = Candidate {
            nbx,
            nby,
            bin_w: bw,
            bin_h: bh,
        };
        if best.as_ref().is_none_or(|current| candidate.beats(current)) {
            best = Some(candidate);
        }

        if nbx <= 1 {
            break;
        }
        margin_x = step_bin_up(margin_x, &mut bw, &mut nbx, budget.align_w);
    }
    let best = best.expect("bin search produced no candidate");

    // The last shrink pass may not match the winning candidate; rerun the
    // size computation once to fix the per-buffer base offsets.
    total_size(
        &cbuf_cpp,
        &zsbuf_cpp,
        best.bin_w,
        best.bin_h,
        &mut cbuf_base,
        &mut zsbuf_base,
    );

    if debug.contains(DebugFlags::MSGS) {
        eprintln!(
            "[gmem] using {} bins of size {}x{}",
            best.nbx * best.nby,
            best.bin_w,
            best.bin_h
        );
    }

    GmemLayout {
        bin_w: best.bin_w,
        bin_h: best.bin_h,
        nbins_x: best.nbx,
        nbins_y: best.nby,
        minx,
        miny,
        width,
        height,
        tpp_x: 0,
        tpp_y: 0,
        cbuf_base,
        zsbuf_base,
        cbuf_cpp,
        zsbuf_cpp,
    }
}

pub(crate) fn effective_area(
    fb: &FramebufferDescriptor,
    budget: &GmemBudget,
    debug: DebugFlags,
) -> (u32, u32, u32, u32) {
    match fb.scissor {
        Some(scissor) if !debug.contains(DebugFlags::NO_SCISSOR) => {
            // round the origin down to the bin alignment
            let minx = scissor.minx & !(budget.align_w - 1);
            let miny = scissor.miny & !(budget.align_h - 1);
            (minx, miny, scissor.maxx - minx, scissor.maxy - miny)
        }
        _ => (0, 0, fb.width, fb.height),
    }
}

/// Bytes of GMEM the enabled buffers need for one `bin_w` x `bin_h` tile,
/// recording each buffer's independently aligned base offset.
pub(crate) fn total_size(
    cbuf_cpp: &[u8; MAX_RENDER_TARGETS],
    zsbuf_cpp: &[u8; 2],
    bin_w: u32,
    bin_h: u32,
    cbuf_base: &mut [u32; MAX_RENDER_TARGETS],
    zsbuf_base: &mut [u32; 2],
) -> u64 {
    let pixels = u64::from(bin_w) * u64::from(bin_h);
    let mut total = 0u64;

    for (slot, &cpp) in cbuf_cpp.iter().enumerate() {
        if cpp == 0 {
            cbuf_base[slot] = 0;
            continue;
        }
        let base = total.next_multiple_of(u64::from(GMEM_BASE_ALIGN));
        cbuf_base[slot] = u32::try_from(base).expect("GMEM color base offset overflow");
        total = base + u64::from(cpp) * pixels;
    }

    for (plane, &cpp) in zsbuf_cpp.iter().enumerate() {
        if cpp == 0 {
            zsbuf_base[plane] = 0;
            continue;
        }
        let base = total.next_multiple_of(u64::from(GMEM_BASE_ALIGN));
        zsbuf_base[plane] = u32::try_from(base).expect("GMEM depth/stencil base offset overflow");
        total = base + u64::from(cpp) * pixels;
    }

    total
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    nbx: u32,
    nby: u32,
    bin_w: u32,
    bin_h: u32,
}

impl Candidate {
    fn bins(&self) -> u32 {
        self.nbx * self.nby
    }

    fn beats(&self, other: &Candidate) -> bool {
        self.bins() < other.bins()
            || (self.bins() == other.bins() && self.nbx + self.nby < other.nbx + other.nby)
    }
}

/// Advances `(bin_w, bin_n)` to the next wider configuration, restoring
/// the invariant `margin = bin_w * bin_n - extent` with margin in
/// `[0, bin_w)`.
pub(crate) fn step_bin_up(mut margin: i64, bin_w: &mut u32, bin_n: &mut u32, align: u32) -> i64 {
    let mut w = *bin_w;
    let mut n = *bin_n;
    assert!(n > 1, "cannot widen bins past a single column");

    loop {
        w += align;
        margin += i64::from(n) * i64::from(align);
        if margin >= i64::from(w) {
            break;
        }
    }
    loop {
        n -= 1;
        margin -= i64::from(w);
        if margin < i64::from(w) {
            break;
        }
    }

    *bin_w = w;
    *bin_n = n;
    margin
}

/// Advances `(bin_h, bin_n)` to the next shorter configuration, under the
/// same margin invariant. Panics when the budget cannot fit even a single
/// minimum-height bin row, which is a caller contract violation.
pub(crate) fn step_bin_down(mut margin: i64, bin_h: &mut u32, bin_n: &mut u32, align: u32) -> i64 {
    let mut h = *bin_h;
    let mut n = *bin_n;

    loop {
        h = h
            .checked_sub(align)
            .expect("GMEM budget cannot fit the minimum bin size");
        margin -= i64::from(n) * i64::from(align);
        if margin < 0 {
            break;
        }
    }
    assert!(h > 0, "GMEM budget cannot fit the minimum bin size");
    loop {
        n += 1;
        margin += i64::from(h);
        if margin >= 0 {
            break;
        }
    }

    *bin_h = h;
    *bin_n = n;
    margin
}
