//! The serial, two-buffer cellular-automaton update.
//!
//! Runs identically whether the tile being stepped is the whole global grid
//! (serial mode, `P_y = P_x = 1`) or one process's slice of it (parallel
//! mode) — the rule only ever looks at cells already present in `read`,
//! inner or halo, and never mutates a halo cell.

use super::tile::Tile;

/// `R` and `ρ` for the smoothing rule, validated once at [`Engine`](crate::app::Engine)
/// construction and shared by every generation.
#[derive(Clone, Copy, Debug)]
pub struct RuleParams {
    pub radius: usize,
    pub roughness: i32,
}

impl RuleParams {
    /// `H`, the majority threshold: `4*R*(R+1) / 2`, integer division.
    pub const fn half_neighbours(&self) -> i32 {
        let r = self.radius as i32;
        (4 * r * (r + 1)) / 2
    }

    /// Total neighbours in the `(2R+1)^2` square minus the center cell.
    pub const fn neighbour_count(&self) -> i32 {
        let r = self.radius as i32;
        4 * r * (r + 1)
    }
}

/// Applies [`RuleParams`] to every inner cell of `read`, writing the result
/// into `write`. Neither buffer's halo is touched.
pub struct LocalStepper {
    params: RuleParams,
}

impl LocalStepper {
    pub const fn new(params: RuleParams) -> Self {
        Self { params }
    }

    pub const fn params(&self) -> RuleParams {
        self.params
    }

    /// One generation: `write[y,x]` from `read`'s `(2R+1)^2` neighbourhood of
    /// `(y,x)`. `read` and `write` must have identical inner/halo dimensions;
    /// `read`'s halo must already hold valid data (from scatter or the prior
    /// generation's halo exchange).
    pub fn step(&self, read: &Tile, write: &mut Tile) {
        debug_assert_eq!(read.inner_rows(), write.inner_rows());
        debug_assert_eq!(read.inner_cols(), write.inner_cols());
        debug_assert_eq!(read.radius(), write.radius());

        let r = self.params.radius;
        let half = self.params.half_neighbours();
        let rho = self.params.roughness;

        for y in 0..read.inner_rows() {
            for x in 0..read.inner_cols() {
                let oy = y + r;
                let ox = x + r;
                let mut walls: i32 = 0;
                for dy in 0..=2 * r {
                    for dx in 0..=2 * r {
                        walls += read.get_outer(oy + dy - r, ox + dx - r) as i32;
                    }
                }
                let center = read.get_outer(oy, ox) as i32;
                walls -= center;

                let next = if walls >= half + rho {
                    1
                } else if walls <= half - rho {
                    0
                } else {
                    center as u8
                };
                write.set_inner(y, x, next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::Cell;

    fn filled(inner_rows: usize, inner_cols: usize, radius: usize, fill: u8) -> Tile {
        let mut t = Tile::new(inner_rows, inner_cols, radius);
        for y in 0..inner_rows {
            for x in 0..inner_cols {
                t.set_inner(y, x, fill);
            }
        }
        t
    }

    #[test]
    fn all_wall_stays_wall() {
        let read = filled(6, 6, 1, Cell::BYTE_WALL);
        let mut write = Tile::new(6, 6, 1);
        let stepper = LocalStepper::new(RuleParams {
            radius: 1,
            roughness: 0,
        });
        stepper.step(&read, &mut write);
        for y in 0..6 {
            for x in 0..6 {
                assert_eq!(write.get_inner(y, x), Cell::BYTE_WALL);
            }
        }
    }

    #[test]
    fn radius_zero_is_identity_unless_roughness_zero() {
        let mut read = Tile::new(4, 4, 0);
        read.set_inner(0, 0, 1);
        read.set_inner(1, 1, 0);
        let mut write = Tile::new(4, 4, 0);
        let stepper = LocalStepper::new(RuleParams {
            radius: 0,
            roughness: 1,
        });
        stepper.step(&read, &mut write);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(write.get_inner(y, x), read.get_inner(y, x));
            }
        }
    }

    #[test]
    fn radius_zero_roughness_zero_flips_every_cell_to_majority() {
        // H = 0, rho = 0: walls(=0) >= H + rho(=0) is always true, so every
        // cell becomes a wall regardless of its previous state.
        let mut read = Tile::new(2, 2, 0);
        read.set_inner(0, 0, 0);
        read.set_inner(1, 1, 0);
        let mut write = Tile::new(2, 2, 0);
        let stepper = LocalStepper::new(RuleParams {
            radius: 0,
            roughness: 0,
        });
        stepper.step(&read, &mut write);
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(write.get_inner(y, x), Cell::BYTE_WALL);
            }
        }
    }

    #[test]
    fn roughness_above_max_neighbours_half_never_flips() {
        // max neighbours for R=1 is 8, H=4; roughness=5 > 4 means neither
        // branch's threshold can ever be crossed by a 0/8 wall count, so the
        // grid is invariant across generations.
        let params = RuleParams {
            radius: 1,
            roughness: 5,
        };
        assert_eq!(params.half_neighbours(), 4);
        assert_eq!(params.neighbour_count(), 8);

        let mut read = filled(4, 4, 1, 0);
        read.set_inner(1, 1, 1);
        read.set_inner(2, 2, 1);
        let mut write = Tile::new(4, 4, 1);
        let stepper = LocalStepper::new(params);
        for _ in 0..3 {
            stepper.step(&read, &mut write);
            assert_eq!(write.buf(), read.buf());
            std::mem::swap(&mut read, &mut write);
        }
    }

    #[test]
    fn halo_cells_are_never_written() {
        let read = filled(2, 2, 1, 0);
        let mut write = Tile::new(2, 2, 1);
        let before = write.buf().to_vec();
        let stepper = LocalStepper::new(RuleParams {
            radius: 1,
            roughness: 1,
        });
        stepper.step(&read, &mut write);
        for y in 0..write.outer_rows() {
            for x in 0..write.outer_cols() {
                let r = write.radius();
                let is_inner = y >= r && y < r + write.inner_rows() && x >= r && x < r + write.inner_cols();
                if !is_inner {
                    assert_eq!(write.get_outer(y, x), before[write.at(y, x)]);
                }
            }
        }
    }
}
