// Core data model: cells, tiles, mesh topology, halo descriptors, stepper.
pub mod domain;

// Messaging seam: Transport trait plus MPI, single-process, and simulated backends.
pub mod net;

// Configuration, engine, driver loop, pacer, metrics.
pub mod app;

// macroquad-backed rendering adapter.
pub mod render;

pub mod error;

pub use app::{Config, Engine, ExecutionMode, GraphicsMode};
pub use domain::{Cell, Mesh};
pub use error::CaveError;
