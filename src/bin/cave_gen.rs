//! Distributed entry point: parses CLI flags, resolves configuration, stands
//! up the mesh and transport for the run (MPI when `--parallel`, a
//! single-process stub otherwise), and hands everything to the generation
//! driver.

use std::process::ExitCode;

use cave_gen::app::config::{CliArgs, ExecutionMode, GraphicsMode};
use cave_gen::app::driver::{self, NullSink};
use cave_gen::app::pacer::{GraphicPacer, HeadlessPacer};
use cave_gen::app::{Config, Engine};
use cave_gen::domain::Mesh;
use cave_gen::error::CaveError;
use cave_gen::net::mpi_transport::MpiEnvironment;
use cave_gen::net::SingleProcessTransport;
use cave_gen::render::{self, MacroquadRenderer};
use clap::Parser;
use tracing::{error, info};

const HELP_CONFIG_TEXT: &str = "\
Configuration file (JSON) recognized keys, each optional:
  cols, rows            u32, global grid dimensions (default 128x128)
  rand_seed             u64, seed for the initial grid fill (default 0)
  last_generation       u32, generation to stop at; 0 means unbounded
  show_graphics         bool, render through a window (default true)
  is_parallel           bool, run across a process mesh (default true)
  x_threads, y_threads  u32, mesh P_x / P_y (default 1x1)
  results_file_path     string, append a metrics CSV row here
  roughness             i32, hysteresis width rho (default 4)
  neighbour_radius      u32, neighborhood half-width R (default 1)
  initial_fill_perc     u32, 0..=100 initial wall percentage (default 45)
  cell_size             u32, sets both cell_width and cell_height
  cell_width, cell_height  u32, pixels per cell (default 4x4)
  draw_edges            bool, outline each drawn cell (default false)
  draw_threads_grid     bool, overlay per-process tile borders (default false)
  max_frame_rate        u32, cap on rendered frames/sec (default 60)
  wall_color, floor_color, threads_grid_color  [u8; 3] RGB triples

CLI flags always override the file; the file always overrides these defaults.";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn build_transport_and_mesh(
    config: &Config,
    mpi_env: &Option<MpiEnvironment>,
) -> Result<(Box<dyn cave_gen::net::Transport>, Mesh), CaveError> {
    match config.mode {
        ExecutionMode::Serial => {
            let mesh = Mesh::single();
            Ok((Box::new(SingleProcessTransport), mesh))
        }
        ExecutionMode::Parallel { p_y, p_x } => {
            let env = mpi_env.as_ref().ok_or_else(|| {
                CaveError::Transport(cave_gen::net::TransportError::Failed(
                    "parallel mode requested but MPI failed to initialize; launch with mpirun/mpiexec".to_owned(),
                ))
            })?;
            let transport = env.transport();
            let mesh = Mesh::new(
                p_y,
                p_x,
                transport.size() as u32,
                transport.rank(),
                config.rows,
                config.cols,
            )?;
            Ok((Box::new(transport), mesh))
        }
    }
}

fn run(config: Config, mpi_env: Option<MpiEnvironment>) -> Result<(), CaveError> {
    let (transport, mesh) = build_transport_and_mesh(&config, &mpi_env)?;
    let is_root = transport.is_root();
    let n_procs = transport.size() as u32;
    let results_file_path = config.results_file_path.clone();
    let metrics_config = config.clone();

    info!(
        target: "cave_gen",
        rank = transport.rank(),
        size = transport.size(),
        mode = ?config.mode,
        "engine_start"
    );

    let engine = Engine::new(config, mesh, transport);

    if is_root && matches!(engine.config.graphics, GraphicsMode::Graphic(_)) {
        // Owns `engine` outright rather than borrowing it, since
        // `Window::from_config` requires a `'static` future: nothing here
        // may reference a shorter-lived stack frame.
        run_graphic_root(engine, results_file_path, metrics_config, n_procs);
        return Ok(());
    }

    let mut engine = engine;
    // Root's graphics loop (`render::run_graphic`) calls `gather_for_render`
    // every frame unconditionally. `gather_for_render` is collective, so
    // every non-root rank must call it at the same cadence or root blocks
    // forever on a receive nobody answers. A true headless run never draws,
    // so it never needs to participate in a gather at all.
    let draw_every_frame = matches!(engine.config.graphics, GraphicsMode::Graphic(_));
    let result = driver::run(&mut engine, &mut HeadlessPacer, &mut NullSink, move |_| {
        draw_every_frame
    });

    if is_root {
        if let Some(path) = results_file_path {
            if let Err(e) = engine.metrics.write_csv(&path, &metrics_config, n_procs) {
                error!(target: "cave_gen", error = %e, "results_csv_write_failed");
            }
        }
    }

    result
}

fn run_graphic_root(mut engine: Engine, results_file_path: Option<std::path::PathBuf>, metrics_config: Config, n_procs: u32) {
    let (inner_rows, inner_cols) = (engine.tiles.read.inner_rows(), engine.tiles.read.inner_cols());
    let Some(mut renderer) = MacroquadRenderer::new(&engine.config, inner_rows, inner_cols) else {
        if let Err(e) = driver::run(&mut engine, &mut HeadlessPacer, &mut NullSink, |_| false) {
            error!(target: "cave_gen", error = %e, "headless_fallback_failed");
        }
        return;
    };
    let conf = render::window_conf(&engine.config);
    macroquad::Window::from_config(conf, async move {
        let mut pacer = GraphicPacer::new(render::poll_pace_decision);
        if let Err(e) = render::run_graphic(&mut engine, &mut renderer, &mut pacer).await {
            error!(target: "cave_gen", error = %e, "graphic_run_failed");
        }
        if let Some(path) = results_file_path {
            if let Err(e) = engine.metrics.write_csv(&path, &metrics_config, n_procs) {
                error!(target: "cave_gen", error = %e, "results_csv_write_failed");
            }
        }
    });
}

fn main() -> ExitCode {
    init_logging();

    let args = CliArgs::parse();
    if args.help_config {
        println!("{HELP_CONFIG_TEXT}");
        return ExitCode::SUCCESS;
    }

    let config = match Config::resolve(&args) {
        Ok(c) => c,
        Err(e) => {
            error!(target: "cave_gen", error = %e, "config_resolution_failed");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let mpi_env = matches!(config.mode, ExecutionMode::Parallel { .. })
        .then(MpiEnvironment::init)
        .flatten();

    match run(config, mpi_env) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "cave_gen", error = %e, "run_failed");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
