//! Per-generation halo synchronization: after the local step and buffer
//! swap, every process exchanges its 8 directional border regions with
//! whichever of its 8 neighbors actually exist.

use crate::domain::{Corner, Direction, HaloDescriptors, Mesh, StridedView, Tile};

use super::Transport;

const T_TOP_LEFT: i32 = 5;
const T_TOP: i32 = 3;
const T_TOP_RIGHT: i32 = 6;
const T_LEFT: i32 = 1;
const T_RIGHT: i32 = 2;
const T_BOTTOM_LEFT: i32 = 7;
const T_BOTTOM: i32 = 4;
const T_BOTTOM_RIGHT: i32 = 8;

/// Tag used when sending *in* `dir` — i.e. the tag a process attaches to the
/// stripe/corner it ships off towards its neighbor in that direction.
const fn send_tag(dir: Direction) -> i32 {
    match dir {
        Direction::TopLeft => T_TOP_LEFT,
        Direction::Top => T_TOP,
        Direction::TopRight => T_TOP_RIGHT,
        Direction::Left => T_LEFT,
        Direction::Right => T_RIGHT,
        Direction::BottomLeft => T_BOTTOM_LEFT,
        Direction::Bottom => T_BOTTOM,
        Direction::BottomRight => T_BOTTOM_RIGHT,
    }
}

fn send_view<'a>(desc: &'a HaloDescriptors, dir: Direction) -> &'a StridedView {
    match dir {
        Direction::Left => &desc.left_send,
        Direction::Right => &desc.right_send,
        Direction::Top => &desc.top_send,
        Direction::Bottom => &desc.bottom_send,
        Direction::TopLeft => &desc.corner_send[Corner::TopLeft as usize],
        Direction::TopRight => &desc.corner_send[Corner::TopRight as usize],
        Direction::BottomLeft => &desc.corner_send[Corner::BottomLeft as usize],
        Direction::BottomRight => &desc.corner_send[Corner::BottomRight as usize],
    }
}

fn halo_view<'a>(desc: &'a HaloDescriptors, dir: Direction) -> &'a StridedView {
    match dir {
        Direction::Left => &desc.left_halo,
        Direction::Right => &desc.right_halo,
        Direction::Top => &desc.top_halo,
        Direction::Bottom => &desc.bottom_halo,
        Direction::TopLeft => &desc.corner_halo[Corner::TopLeft as usize],
        Direction::TopRight => &desc.corner_halo[Corner::TopRight as usize],
        Direction::BottomLeft => &desc.corner_halo[Corner::BottomLeft as usize],
        Direction::BottomRight => &desc.corner_halo[Corner::BottomRight as usize],
    }
}

/// Order the sends are issued in, matching the spec's numbered protocol
/// steps 1-5: left, right, top, bottom, then the four corners.
const SEND_ORDER: [Direction; 8] = [
    Direction::Left,
    Direction::Right,
    Direction::Top,
    Direction::Bottom,
    Direction::TopLeft,
    Direction::TopRight,
    Direction::BottomLeft,
    Direction::BottomRight,
];

/// Order the receives are awaited in, matching step 6: right, left, bottom,
/// top, then the four corners.
const RECV_ORDER: [Direction; 8] = [
    Direction::Right,
    Direction::Left,
    Direction::Bottom,
    Direction::Top,
    Direction::TopLeft,
    Direction::TopRight,
    Direction::BottomLeft,
    Direction::BottomRight,
];

pub struct HaloExchange;

impl HaloExchange {
    /// Issue this generation's 8 directional sends. `tile`'s inner region
    /// must already hold this generation's data. Split out from [`recv`](Self::recv)
    /// so a harness driving several ranks on one thread (real MPI processes
    /// never need this split — each runs its own loop concurrently) can
    /// stage every rank's sends before any rank's blocking receive runs.
    pub fn send(transport: &dyn Transport, mesh: &Mesh, desc: &HaloDescriptors, tile: &Tile) {
        transport.send_phase(&mut |batch| {
            for dir in SEND_ORDER {
                if let Some(dest) = mesh.neighbor(dir) {
                    let data = send_view(desc, dir).pack(tile.buf());
                    batch.send(dest, send_tag(dir), data);
                }
            }
        });
        // Every queued send is guaranteed complete now that `send_phase`
        // has returned.
    }

    /// Blocking-receive this generation's 8 directional halos into `tile`.
    /// Must run after every neighbor that could send to this tile has
    /// already called [`send`](Self::send) this generation.
    pub fn recv(transport: &dyn Transport, mesh: &Mesh, desc: &HaloDescriptors, tile: &mut Tile) {
        for dir in RECV_ORDER {
            if let Some(source) = mesh.neighbor(dir) {
                let view = halo_view(desc, dir);
                let mut buf = vec![0u8; view.len()];
                transport.recv_into(source, send_tag(dir.opposite()), &mut buf);
                view.unpack(tile.buf_mut(), &buf);
            }
        }
    }

    /// Synchronize `tile`'s halo with every existing neighbor in `mesh`:
    /// [`send`](Self::send) then [`recv`](Self::recv). On return, every halo
    /// slab whose neighbor exists is a byte-exact copy of that neighbor's
    /// adjacent inner slab, and every slab without a neighbor is untouched
    /// (left at its prior, `wall`-pinned value). Correct for any transport
    /// where ranks run concurrently (MPI, single-process); a single-threaded
    /// multi-rank simulation must instead drive [`send`](Self::send) across
    /// every rank before [`recv`](Self::recv) on any of them.
    pub fn run(transport: &dyn Transport, mesh: &Mesh, desc: &HaloDescriptors, tile: &mut Tile) {
        Self::send(transport, mesh, desc, tile);
        Self::recv(transport, mesh, desc, tile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Cell;
    use crate::net::sim::{SimNetwork, SimTransport};

    fn make_grid(p_y: u32, p_x: u32, rows: u32, cols: u32, radius: usize, fill: &dyn Fn(u32, u32) -> u8) -> Vec<Tile> {
        let inner_rows = (rows / p_y) as usize;
        let inner_cols = (cols / p_x) as usize;
        let n = (p_y * p_x) as usize;
        let mut tiles = Vec::with_capacity(n);
        for rank in 0..n {
            let cy = rank as u32 / p_x;
            let cx = rank as u32 % p_x;
            let mut tile = Tile::new(inner_rows, inner_cols, radius);
            for y in 0..inner_rows {
                for x in 0..inner_cols {
                    let gy = cy * inner_rows as u32 + y as u32;
                    let gx = cx * inner_cols as u32 + x as u32;
                    tile.set_inner(y, x, fill(gy, gx));
                }
            }
            tiles.push(tile);
        }
        tiles
    }

    #[test]
    fn sentinel_adjacent_halo_stays_wall() {
        let radius = 1;
        let mut tiles = make_grid(2, 2, 4, 4, radius, &|_, _| 0);
        let net = SimNetwork::new();
        let meshes: Vec<Mesh> = (0..4)
            .map(|r| Mesh::new(2, 2, 4, r, 4, 4).unwrap())
            .collect();
        let desc = HaloDescriptors::new(2, 2, radius);
        let transports: Vec<SimTransport> =
            (0..4).map(|r| SimTransport::new(net.clone(), r, 4)).collect();

        for (i, (t, mesh)) in transports.iter().zip(meshes.iter()).enumerate() {
            HaloExchange::send(t, mesh, &desc, &tiles[i]);
        }
        for (i, (t, mesh)) in transports.iter().zip(meshes.iter()).enumerate() {
            HaloExchange::recv(t, mesh, &desc, &mut tiles[i]);
        }

        // Rank 0 is the top-left corner: its top and left halos (and the
        // diagonal TL/TR/BL halos that have no corresponding neighbor) stay
        // at the wall-pinned initial value.
        let rank0 = &tiles[0];
        for x in 0..rank0.outer_cols() {
            assert_eq!(rank0.get_outer(0, x), Cell::BYTE_WALL);
        }
        for y in 0..rank0.outer_rows() {
            assert_eq!(rank0.get_outer(y, 0), Cell::BYTE_WALL);
        }
    }

    #[test]
    fn halo_matches_neighbors_inner_slab_byte_exact() {
        let radius = 1;
        let mut tiles = make_grid(1, 2, 3, 4, radius, &|gy, gx| ((gy + gx) % 2) as u8);
        let net = SimNetwork::new();
        let meshes: Vec<Mesh> = (0..2)
            .map(|r| Mesh::new(1, 2, 2, r, 3, 4).unwrap())
            .collect();
        let desc = HaloDescriptors::new(3, 2, radius);
        let transports: Vec<SimTransport> =
            (0..2).map(|r| SimTransport::new(net.clone(), r, 2)).collect();

        for (i, (t, mesh)) in transports.iter().zip(meshes.iter()).enumerate() {
            HaloExchange::send(t, mesh, &desc, &tiles[i]);
        }
        for (i, (t, mesh)) in transports.iter().zip(meshes.iter()).enumerate() {
            HaloExchange::recv(t, mesh, &desc, &mut tiles[i]);
        }

        // Rank 0's right halo column must equal rank 1's leftmost inner
        // column, and vice versa.
        for y in 0..3 {
            assert_eq!(tiles[0].get_outer(y + radius, 2 + radius), tiles[1].get_inner(y, 0));
            assert_eq!(tiles[1].get_outer(y + radius, 0), tiles[0].get_inner(y, 1));
        }
    }
}
