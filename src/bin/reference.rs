//! Serial reference run: forces single-process, headless execution
//! regardless of `--parallel`/`--graphic` flags, so its output can be diffed
//! against a parallel run of the same seed to confirm they produce
//! bitwise-identical grids (the property the mesh decomposition is supposed
//! to preserve). Prints the final grid as ASCII (`#` wall, `.` floor) to
//! stdout.

use std::process::ExitCode;

use cave_gen::app::config::{CliArgs, ExecutionMode, GraphicsMode};
use cave_gen::app::driver::{self, NullSink};
use cave_gen::app::pacer::HeadlessPacer;
use cave_gen::app::{Config, Engine};
use cave_gen::domain::Mesh;
use cave_gen::net::SingleProcessTransport;
use clap::Parser;
use tracing::error;

fn print_grid(engine: &Engine) {
    let tile = &engine.tiles.read;
    let r = tile.radius();
    for y in 0..tile.inner_rows() {
        let mut line = String::with_capacity(tile.inner_cols());
        for x in 0..tile.inner_cols() {
            line.push(if tile.get_outer(y + r, x + r) == 1 { '#' } else { '.' });
        }
        println!("{line}");
    }
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args = CliArgs::parse();
    let mut config = match Config::resolve(&args) {
        Ok(c) => c,
        Err(e) => {
            error!(target: "reference", error = %e, "config_resolution_failed");
            return ExitCode::from(e.exit_code() as u8);
        }
    };
    config.mode = ExecutionMode::Serial;
    config.graphics = GraphicsMode::Headless;

    let mesh = Mesh::single();
    let mut engine = Engine::new(config, mesh, Box::new(SingleProcessTransport));

    if let Err(e) = driver::run(&mut engine, &mut HeadlessPacer, &mut NullSink, |_| false) {
        error!(target: "reference", error = %e, "run_failed");
        return ExitCode::from(e.exit_code() as u8);
    }

    print_grid(&engine);
    ExitCode::SUCCESS
}
