//! Core data model: cells, tiles, process topology, strided halo views, and
//! the serial stencil update. No networking or I/O lives here.

pub mod cell;
pub mod descriptors;
pub mod mesh;
pub mod stepper;
pub mod tile;

pub use cell::Cell;
pub use descriptors::{Corner, HaloDescriptors, StridedView};
pub use mesh::{Direction, Mesh, MeshError, NO_NEIGHBOR};
pub use stepper::{LocalStepper, RuleParams};
pub use tile::{Tile, TilePair};
