//! The generation loop: composes gather, halo exchange, local step, and
//! buffer swap behind one [`Pacer`]-driven loop shared by headless and
//! graphic, serial and parallel runs alike.

use std::time::Instant;

use tracing::{debug, info};

use crate::app::engine::Engine;
use crate::app::metrics::FrameTiming;
use crate::app::pacer::{PaceDecision, Pacer};
use crate::error::CaveError;

/// Lets the driver paint a frame without depending on a concrete renderer
/// type; `None` (the headless case) means "don't gather, don't draw".
pub trait FrameSink {
    fn begin_frame(&mut self);
    /// Paint the gathered `N * inner_rows * inner_cols` byte grid.
    fn draw(&mut self, grid: &[u8]);
    fn end_frame(&mut self);
}

/// A [`FrameSink`] that does nothing — used for headless runs and for every
/// non-root rank even in graphics mode.
pub struct NullSink;

impl FrameSink for NullSink {
    fn begin_frame(&mut self) {}
    fn draw(&mut self, _grid: &[u8]) {}
    fn end_frame(&mut self) {}
}

/// Run generations until the pacer cancels or the configured generation
/// limit is reached. `draw_this_frame` decides, per frame, whether gather +
/// render should run at all (root asks its renderer's frame cadence; a
/// headless engine always answers `false`).
pub fn run<P, S>(
    engine: &mut Engine,
    pacer: &mut P,
    sink: &mut S,
    draw_this_frame: impl Fn(u32) -> bool,
) -> Result<(), CaveError>
where
    P: Pacer,
    S: FrameSink,
{
    info!(
        target: "driver",
        rank = engine.transport.rank(),
        size = engine.transport.size(),
        rows = engine.config.rows,
        cols = engine.config.cols,
        "run_start"
    );

    engine.scatter_initial();

    loop {
        if engine.generation_limit_reached() {
            break;
        }
        match pacer.may_step() {
            PaceDecision::Cancel => {
                info!(target: "driver", "user_abort");
                return Err(CaveError::UserInterrupt);
            }
            PaceDecision::Advance => {}
        }

        let frame_start = Instant::now();
        let mut draw_elapsed = std::time::Duration::ZERO;

        if draw_this_frame(engine.generation()) {
            sink.begin_frame();
            let draw_start = Instant::now();
            if let Some(grid) = engine.gather_for_render() {
                sink.draw(&grid);
            }
            sink.end_frame();
            draw_elapsed = draw_start.elapsed();
        }

        let comm_start = Instant::now();
        engine.exchange_halo();
        let comm_elapsed = comm_start.elapsed();

        let compute_start = Instant::now();
        engine.step();
        let compute_elapsed = compute_start.elapsed();

        engine.record_frame(FrameTiming {
            communication: comm_elapsed,
            computation: compute_elapsed,
            drawing: draw_elapsed,
            total: frame_start.elapsed(),
        });

        if engine.generation() % 50 == 0 {
            debug!(
                target: "driver",
                generation = engine.generation(),
                "heartbeat"
            );
        }
    }

    info!(
        target: "driver",
        rank = engine.transport.rank(),
        generations = engine.generation(),
        elapsed_ms = engine.metrics.total_time().as_millis(),
        "run_complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::{CliArgs, Config};
    use crate::app::pacer::HeadlessPacer;
    use crate::domain::Mesh;
    use crate::net::SingleProcessTransport;
    use std::path::PathBuf;

    fn engine(last_generation: Option<u32>) -> Engine {
        let args = CliArgs {
            config: PathBuf::from("./config/default.cfg"),
            graphic: false,
            no_graphic: true,
            parallel: false,
            serial: true,
            x_threads: None,
            y_threads: None,
            cols: Some(4),
            rows: Some(4),
            radius: Some(1),
            roughness: Some(1),
            fill: Some(40),
            results_file: None,
            help_config: false,
        };
        let mut config = Config::resolve(&args).unwrap();
        config.last_generation = last_generation;
        let mesh = Mesh::single();
        Engine::new(config, mesh, Box::new(SingleProcessTransport))
    }

    #[test]
    fn headless_run_advances_exactly_the_configured_generations() {
        let mut e = engine(Some(3));
        let mut pacer = HeadlessPacer;
        let mut sink = NullSink;
        run(&mut e, &mut pacer, &mut sink, |_| false).unwrap();
        assert_eq!(e.generation(), 3);
    }

    #[test]
    fn cancel_from_pacer_returns_user_interrupt() {
        struct CancelImmediately;
        impl Pacer for CancelImmediately {
            fn may_step(&mut self) -> PaceDecision {
                PaceDecision::Cancel
            }
        }
        let mut e = engine(Some(10));
        let mut pacer = CancelImmediately;
        let mut sink = NullSink;
        let result = run(&mut e, &mut pacer, &mut sink, |_| false);
        assert!(matches!(result, Err(CaveError::UserInterrupt)));
        assert_eq!(e.generation(), 0);
    }

    #[test]
    fn drawing_gathers_root_grid_into_sink() {
        struct CaptureSink {
            frames: Vec<Vec<u8>>,
        }
        impl FrameSink for CaptureSink {
            fn begin_frame(&mut self) {}
            fn draw(&mut self, grid: &[u8]) {
                self.frames.push(grid.to_vec());
            }
            fn end_frame(&mut self) {}
        }

        let mut e = engine(Some(2));
        let mut pacer = HeadlessPacer;
        let mut sink = CaptureSink { frames: Vec::new() };
        run(&mut e, &mut pacer, &mut sink, |_| true).unwrap();
        assert_eq!(sink.frames.len(), 2);
        assert_eq!(sink.frames[0].len(), 16);
    }
}
