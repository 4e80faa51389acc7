//! Strided buffer-view templates over a [`Tile`](super::tile::Tile).
//!
//! Built once from a tile's `(inner_rows, inner_cols, radius)` and reused for
//! every generation: the halo exchange and scatter/gather phases read the
//! byte offsets and strides from here rather than recomputing index
//! arithmetic at each call site.

/// A rectangular region inside a tile's flat byte buffer: `block_rows` blocks
/// of `block_cols` contiguous bytes each, spaced `stride` bytes apart.
///
/// `ColumnStripe`, `RowStripe`, `Corner`, `InnerView` and `InnerContig` below
/// are all instances of this same shape; the halo exchange and scatter/
/// gather code read and write through it uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StridedView {
    /// Byte offset of the first block's first byte, from the tile buffer start.
    pub offset: usize,
    /// Number of blocks (rows of the region).
    pub block_rows: usize,
    /// Bytes per block (columns of the region).
    pub block_cols: usize,
    /// Byte distance between the start of consecutive blocks.
    pub stride: usize,
}

impl StridedView {
    /// Total bytes covered: `block_rows * block_cols`.
    pub const fn len(&self) -> usize {
        self.block_rows * self.block_cols
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy this view's blocks out of `buf` into a freshly packed, contiguous
    /// `Vec<u8>` of length `self.len()` — the wire representation sent over
    /// a [`Transport`](crate::net::Transport).
    pub fn pack(&self, buf: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for row in 0..self.block_rows {
            let start = self.offset + row * self.stride;
            out.extend_from_slice(&buf[start..start + self.block_cols]);
        }
        out
    }

    /// Scatter a contiguous `data` buffer (as produced by [`pack`](Self::pack))
    /// back into `buf` at this view's strided blocks.
    pub fn unpack(&self, buf: &mut [u8], data: &[u8]) {
        debug_assert_eq!(data.len(), self.len());
        for row in 0..self.block_rows {
            let start = self.offset + row * self.stride;
            let src = &data[row * self.block_cols..(row + 1) * self.block_cols];
            buf[start..start + self.block_cols].copy_from_slice(src);
        }
    }
}

/// The five reusable view templates for one process's tile shape, built once
/// at startup from `(inner_rows, inner_cols, radius)` and held by the
/// [`Engine`](crate::app::Engine) for the life of the run.
#[derive(Clone, Debug)]
pub struct HaloDescriptors {
    pub inner_rows: usize,
    pub inner_cols: usize,
    pub radius: usize,
    pub outer_cols: usize,

    /// The `inner_rows x inner_cols` subarray at offset `(R,R)`.
    pub inner: StridedView,
    /// `R`-byte-wide stripe for the left halo (receive side).
    pub left_halo: StridedView,
    /// `R`-byte-wide stripe for the right halo (receive side).
    pub right_halo: StridedView,
    /// `R`-byte-wide stripe of inner cells adjacent to the left edge (send side).
    pub left_send: StridedView,
    /// `R`-byte-wide stripe of inner cells adjacent to the right edge (send side).
    pub right_send: StridedView,
    /// `R`-row stripe for the top halo (receive side).
    pub top_halo: StridedView,
    /// `R`-row stripe for the bottom halo (receive side).
    pub bottom_halo: StridedView,
    /// `R`-row stripe of inner cells adjacent to the top edge (send side).
    pub top_send: StridedView,
    /// `R`-row stripe of inner cells adjacent to the bottom edge (send side).
    pub bottom_send: StridedView,
    /// The four `R x R` corner halos (receive side), indexed by [`Corner`].
    pub corner_halo: [StridedView; 4],
    /// The four `R x R` inner corners (send side), indexed by [`Corner`].
    pub corner_send: [StridedView; 4],
    /// Flat, contiguous `inner_rows * inner_cols` view — root-side
    /// scatter/gather layout, one tile concatenated after another.
    pub inner_contig: StridedView,
}

/// Index into [`HaloDescriptors::corner_halo`] / `corner_send`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl HaloDescriptors {
    pub fn new(inner_rows: usize, inner_cols: usize, radius: usize) -> Self {
        let outer_cols = inner_cols + 2 * radius;
        let outer_rows = inner_rows + 2 * radius;

        let inner = StridedView {
            offset: outer_cols * radius + radius,
            block_rows: inner_rows,
            block_cols: inner_cols,
            stride: outer_cols,
        };

        let left_halo = StridedView {
            offset: outer_cols * radius,
            block_rows: inner_rows,
            block_cols: radius,
            stride: outer_cols,
        };
        let right_halo = StridedView {
            offset: outer_cols * radius + inner_cols + radius,
            block_rows: inner_rows,
            block_cols: radius,
            stride: outer_cols,
        };
        let left_send = StridedView {
            offset: outer_cols * radius + radius,
            block_rows: inner_rows,
            block_cols: radius,
            stride: outer_cols,
        };
        let right_send = StridedView {
            offset: outer_cols * radius + inner_cols,
            block_rows: inner_rows,
            block_cols: radius,
            stride: outer_cols,
        };

        let top_halo = StridedView {
            offset: radius,
            block_rows: radius,
            block_cols: inner_cols,
            stride: outer_cols,
        };
        let bottom_halo = StridedView {
            offset: outer_cols * (inner_rows + radius) + radius,
            block_rows: radius,
            block_cols: inner_cols,
            stride: outer_cols,
        };
        let top_send = StridedView {
            offset: outer_cols * radius + radius,
            block_rows: radius,
            block_cols: inner_cols,
            stride: outer_cols,
        };
        let bottom_send = StridedView {
            offset: outer_cols * inner_rows + radius,
            block_rows: radius,
            block_cols: inner_cols,
            stride: outer_cols,
        };

        let corner_halo = [
            StridedView {
                offset: 0,
                block_rows: radius,
                block_cols: radius,
                stride: outer_cols,
            },
            StridedView {
                offset: inner_cols + radius,
                block_rows: radius,
                block_cols: radius,
                stride: outer_cols,
            },
            StridedView {
                offset: outer_cols * (inner_rows + radius),
                block_rows: radius,
                block_cols: radius,
                stride: outer_cols,
            },
            StridedView {
                offset: outer_cols * (inner_rows + radius) + inner_cols + radius,
                block_rows: radius,
                block_cols: radius,
                stride: outer_cols,
            },
        ];
        let corner_send = [
            StridedView {
                offset: outer_cols * radius + radius,
                block_rows: radius,
                block_cols: radius,
                stride: outer_cols,
            },
            StridedView {
                offset: outer_cols * radius + inner_cols,
                block_rows: radius,
                block_cols: radius,
                stride: outer_cols,
            },
            StridedView {
                offset: outer_cols * inner_rows + radius,
                block_rows: radius,
                block_cols: radius,
                stride: outer_cols,
            },
            StridedView {
                offset: outer_cols * inner_rows + inner_cols,
                block_rows: radius,
                block_cols: radius,
                stride: outer_cols,
            },
        ];

        let inner_contig = StridedView {
            offset: 0,
            block_rows: 1,
            block_cols: inner_rows * inner_cols,
            stride: inner_rows * inner_cols,
        };

        debug_assert_eq!(outer_rows, inner_rows + 2 * radius);

        Self {
            inner_rows,
            inner_cols,
            radius,
            outer_cols,
            inner,
            left_halo,
            right_halo,
            left_send,
            right_send,
            top_halo,
            bottom_halo,
            top_send,
            bottom_send,
            corner_halo,
            corner_send,
            inner_contig,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::Tile;

    #[test]
    fn inner_view_matches_tile_pack_inner_contig() {
        let mut tile = Tile::new(3, 4, 2);
        for y in 0..3 {
            for x in 0..4 {
                tile.set_inner(y, x, ((y * 4 + x) % 2) as u8);
            }
        }
        let desc = HaloDescriptors::new(3, 4, 2);
        assert_eq!(desc.inner.pack(tile.buf()), tile.pack_inner_contig());
    }

    #[test]
    fn left_send_and_left_halo_are_adjacent_same_shape_regions() {
        let desc = HaloDescriptors::new(4, 4, 1);
        assert_eq!(desc.left_send.len(), desc.left_halo.len());
        assert_eq!(desc.left_send.block_rows, 4);
        assert_eq!(desc.left_send.block_cols, 1);
        // left_send reads the leftmost inner column; left_halo is one
        // column further left (into the halo).
        assert_eq!(desc.left_send.offset, desc.left_halo.offset + 1);
    }

    #[test]
    fn corner_views_have_radius_squared_bytes() {
        let desc = HaloDescriptors::new(6, 6, 2);
        for c in &desc.corner_halo {
            assert_eq!(c.len(), 4);
        }
        for c in &desc.corner_send {
            assert_eq!(c.len(), 4);
        }
    }

    #[test]
    fn round_trip_pack_unpack_is_identity() {
        let mut tile = Tile::new(5, 5, 1);
        for y in 0..5 {
            for x in 0..5 {
                tile.set_inner(y, x, ((x + y) % 2) as u8);
            }
        }
        let desc = HaloDescriptors::new(5, 5, 1);
        let packed = desc.top_send.pack(tile.buf());
        let mut other = Tile::new(5, 5, 1);
        desc.top_halo.unpack(other.buf_mut(), &packed);
        assert_eq!(desc.top_halo.pack(other.buf()), packed);
    }
}
