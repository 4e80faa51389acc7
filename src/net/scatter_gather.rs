//! Initial grid distribution and periodic gather-for-rendering, built on top
//! of [`Transport`]'s scatter/gather primitives and [`Tile`]'s contiguous
//! inner-region pack/unpack.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Cell, Tile};

use super::Transport;

/// Build the root-side concatenated initial grid: fills the *whole*
/// `rows x cols` global grid from one seeded draw sequence, in canonical
/// row-major `(gy, gx)` order, then slices it into `p_y * p_x` per-rank
/// chunks of `inner_rows * inner_cols` bytes, one per rank in rank order.
///
/// Filling the global grid first and slicing second — rather than drawing
/// independently per rank-chunk — is what makes a serial run (`p_y = p_x =
/// 1`, one chunk covering the whole grid) and a parallel run with the same
/// seed agree cell-for-cell: the draw sequence only ever depends on `(gy,
/// gx)`, never on how many ranks happen to divide it up.
///
/// `seed == 0` draws from OS entropy (non-reproducible); any other value
/// seeds a deterministic [`StdRng`].
pub fn build_initial_grid(
    rows: u32,
    cols: u32,
    p_y: u32,
    p_x: u32,
    initial_fill_perc: u32,
    seed: u64,
) -> Vec<u8> {
    let mut rng: StdRng = if seed == 0 {
        StdRng::from_os_rng()
    } else {
        StdRng::seed_from_u64(seed)
    };
    let (rows, cols) = (rows as usize, cols as usize);
    let mut global = vec![Cell::BYTE_FLOOR; rows * cols];
    for cell in global.iter_mut() {
        *cell = if rng.random_range(0..100) < initial_fill_perc {
            Cell::BYTE_WALL
        } else {
            Cell::BYTE_FLOOR
        };
    }

    let inner_rows = rows / p_y as usize;
    let inner_cols = cols / p_x as usize;
    let size = (p_y * p_x) as usize;
    let mut out = vec![Cell::BYTE_FLOOR; rows * cols];
    for rank in 0..size {
        let cy = rank / p_x as usize;
        let cx = rank % p_x as usize;
        for y in 0..inner_rows {
            let gy = cy * inner_rows + y;
            let global_row_start = gy * cols + cx * inner_cols;
            let out_row_start = rank * inner_rows * inner_cols + y * inner_cols;
            out[out_row_start..out_row_start + inner_cols]
                .copy_from_slice(&global[global_row_start..global_row_start + inner_cols]);
        }
    }
    out
}

/// Distribute `root_grid` (present only on root) into `tile`'s inner region.
/// Collective: every rank must call this, root included.
pub fn scatter(transport: &dyn Transport, tile: &mut Tile, root_grid: Option<&[u8]>) {
    let chunk = tile.inner_rows() * tile.inner_cols();
    let mut recv = vec![0u8; chunk];
    if transport.is_root() {
        let send = root_grid.expect("root must supply the concatenated initial grid");
        debug_assert_eq!(send.len(), chunk * transport.size() as usize);
        transport.scatter_root(send, &mut recv);
    } else {
        transport.scatter_recv(&mut recv);
    }
    tile.unpack_inner_contig(&recv);
}

/// Collect every rank's inner region back into one concatenated buffer, in
/// rank order. Only meaningful on root — non-root callers pass `None` and
/// merely participate in the collective.
pub fn gather(transport: &dyn Transport, tile: &Tile, root_out: Option<&mut Vec<u8>>) {
    let send = tile.pack_inner_contig();
    if transport.is_root() {
        let out = root_out.expect("root must supply the destination gather buffer");
        out.resize(send.len() * transport.size() as usize, 0);
        transport.gather_root(&send, out);
    } else {
        transport.gather_send(&send);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::sim::{SimNetwork, SimTransport};

    #[test]
    fn scatter_then_gather_with_no_stepping_is_identity() {
        let (rows, cols, p_y, p_x) = (4, 6, 2, 3);
        let inner_rows = 2;
        let inner_cols = 2;
        let p = 6usize;
        let grid = build_initial_grid(rows, cols, p_y, p_x, 50, 7);

        let net = SimNetwork::new();
        let transports: Vec<SimTransport> = (0..p as i32)
            .map(|r| SimTransport::new(net.clone(), r, p as i32))
            .collect();
        let mut tiles: Vec<Tile> = (0..p).map(|_| Tile::new(inner_rows, inner_cols, 1)).collect();

        for (rank, (t, tile)) in transports.iter().zip(tiles.iter_mut()).enumerate() {
            let root_grid = (rank == 0).then_some(grid.as_slice());
            scatter(t, tile, root_grid);
        }

        // Gather is collective: the simulated transport requires every
        // non-root rank's send to be queued before root's blocking collect
        // runs, so non-root ranks must call `gather` before root does.
        let mut gathered = Vec::new();
        for (t, tile) in transports.iter().zip(tiles.iter()).skip(1) {
            gather(t, tile, None);
        }
        gather(&transports[0], &tiles[0], Some(&mut gathered));

        assert_eq!(gathered, grid);
    }

    #[test]
    fn same_seed_produces_same_grid() {
        let a = build_initial_grid(4, 4, 2, 2, 40, 99);
        let b = build_initial_grid(4, 4, 2, 2, 40, 99);
        assert_eq!(a, b);
    }

    #[test]
    fn fill_perc_zero_is_all_floor() {
        let grid = build_initial_grid(5, 5, 1, 1, 0, 123);
        assert!(grid.iter().all(|&b| b == Cell::BYTE_FLOOR));
    }

    #[test]
    fn fill_perc_hundred_is_all_wall() {
        let grid = build_initial_grid(5, 5, 1, 1, 100, 123);
        assert!(grid.iter().all(|&b| b == Cell::BYTE_WALL));
    }

    #[test]
    fn serial_and_parallel_slice_the_same_global_draw_sequence() {
        // A 1x1 "mesh" just returns the raw global draw order; any other
        // mesh shape over the same grid must slice that same sequence, not
        // draw independently per rank.
        let serial = build_initial_grid(4, 4, 1, 1, 50, 42);
        let parallel = build_initial_grid(4, 4, 2, 2, 50, 42);
        let cols = 4;
        let inner_rows = 2;
        let inner_cols = 2;
        for rank in 0..4 {
            let cy = rank / 2;
            let cx = rank % 2;
            for y in 0..inner_rows {
                for x in 0..inner_cols {
                    let gy = cy * inner_rows + y;
                    let gx = cx * inner_cols + x;
                    let expected = serial[gy * cols + gx];
                    let actual = parallel[rank * inner_rows * inner_cols + y * inner_cols + x];
                    assert_eq!(actual, expected, "rank {rank} cell ({y},{x})");
                }
            }
        }
    }
}
