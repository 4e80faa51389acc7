//! Application layer: configuration, the owning [`Engine`], the generation
//! [`driver`], and the [`pacer`] abstraction that lets headless and graphic
//! runs share one loop body.

pub mod config;
pub mod driver;
pub mod engine;
pub mod metrics;
pub mod pacer;

pub use config::{CliArgs, Config, ExecutionMode, GraphicsMode};
pub use engine::Engine;
pub use metrics::Metrics;
pub use pacer::{GraphicPacer, HeadlessPacer, PaceDecision, Pacer};
