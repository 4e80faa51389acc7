//! The job-wide error taxonomy. Every fallible entry point in this crate
//! returns `Result<_, CaveError>` (or a type convertible into it); there is
//! no local recovery anywhere above this — `main` converts the first `Err`
//! it sees into one logged message and a process exit.

use thiserror::Error;

use crate::domain::MeshError;
use crate::net::TransportError;

#[derive(Error, Debug)]
pub enum CaveError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid mesh/grid configuration: {0}")]
    Mesh(#[from] MeshError),

    #[error("messaging substrate failure: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to initialize the display: {0}")]
    Window(String),

    #[error("job aborted by user")]
    UserInterrupt,
}

impl CaveError {
    /// The process exit code this error maps to, per §6 of the design.
    pub const fn exit_code(&self) -> i32 {
        match self {
            CaveError::Config(_) | CaveError::Mesh(_) => 1,
            CaveError::Transport(_) | CaveError::Window(_) => 1,
            CaveError::UserInterrupt => 130,
        }
    }
}
