//! Raster-order tile assignment.

use gmem_protocol::{GenerationCaps, TileSequencing};

use crate::{GmemLayout, PipeTable};

/// Field width of the packed row/col sequence encoding.
const PACKED_FIELD_BITS: u32 = 3;

/// One grid cell: pixel-space offset, clipped extent, owning pipe, and
/// sequence number within that pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub xoff: u32,
    pub yoff: u32,
    pub bin_w: u32,
    pub bin_h: u32,
    pub pipe: u32,
    pub seq: u32,
}

/// Walks the grid row-major, top-to-bottom, left-to-right, clipping the
/// last row and column at the render-area boundary.
pub fn assign_tiles(layout: &GmemLayout, pipes: &PipeTable, caps: &GenerationCaps) -> Vec<Tile> {
    assert!(
        layout.tpp_x >= 1 && layout.tpp_y >= 1,
        "pipes must be assigned before tiles"
    );

    let pipes_per_row = layout.nbins_x.div_ceil(layout.tpp_x);
    let mut counters = vec![0u32; pipes.used()];
    let mut tiles = Vec::with_capacity(layout.tile_count());

    let mut yoff = layout.miny;
    for row in 0..layout.nbins_y {
        let bin_h = layout.bin_h.min(layout.miny + layout.height - yoff);
        let mut xoff = layout.minx;

        for col in 0..layout.nbins_x {
            let pipe = (row / layout.tpp_y) * pipes_per_row + col / layout.tpp_x;
            let pipe_index = pipe as usize;
            assert!(
                pipe_index < pipes.used(),
                "tile ({col}, {row}) maps to pipe {pipe} beyond the {} used slots",
                pipes.used()
            );

            let bin_w = layout.bin_w.min(layout.minx + layout.width - xoff);
            let seq = match caps.sequencing {
                TileSequencing::PerPipeCounter => {
                    let seq = counters[pipe_index];
                    counters[pipe_index] += 1;
                    seq
                }
                TileSequencing::PackedRowCol => {
                    let row_field = row % layout.tpp_y + 1;
                    let col_field = col % layout.tpp_x + 1;
                    assert!(
                        row_field < 1 << PACKED_FIELD_BITS && col_field < 1 << PACKED_FIELD_BITS,
                        "tiles-per-pipe too large for packed sequencing"
                    );
                    row_field << PACKED_FIELD_BITS | col_field
                }
            };

            tiles.push(Tile {
                xoff,
                yoff,
                bin_w,
                bin_h,
                pipe,
                seq,
            });
            xoff += bin_w;
        }
        yoff += bin_h;
    }

    tiles
}
