//! CLI flags (`clap`) layered over a JSON config file (`serde`/`serde_json`).
//!
//! Precedence, highest first: explicit CLI flag > value from the JSON config
//! file > built-in default. Unknown JSON keys are ignored by construction
//! (every [`ConfigFile`] field carries `#[serde(default = ...)]`, so a key
//! this binary doesn't know about simply never gets deserialized into
//! anything and never surfaces as an error).

use std::io::Write as _;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::CaveError;

pub type Color = [u8; 3];

/// Grid cells beyond this count cannot be rendered at a legible size on a
/// typical window; graphics mode rejects configurations larger than this.
pub const MAX_CELLS_FOR_GRAPHICS: u64 = 1_382_400;

pub const DEFAULT_CONFIG_PATH: &str = "./config/default.cfg";

#[derive(Parser, Debug)]
#[command(
    name = "cave-gen",
    about = "Distributed cellular-automaton cave generator"
)]
pub struct CliArgs {
    /// Load configuration from the given JSON file.
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable rendering.
    #[arg(short = 'g', long = "graphic", conflicts_with = "no_graphic")]
    pub graphic: bool,
    /// Disable rendering.
    #[arg(short = 'G', long = "no-graphic")]
    pub no_graphic: bool,

    /// Enable parallel (multi-process) mode.
    #[arg(short = 'p', long = "parallel", conflicts_with = "serial")]
    pub parallel: bool,
    /// Enable serial (single-process) mode.
    #[arg(short = 's', long = "serial")]
    pub serial: bool,

    /// Mesh width, `P_x`.
    #[arg(short = 'x')]
    pub x_threads: Option<u32>,
    /// Mesh height, `P_y`.
    #[arg(short = 'y')]
    pub y_threads: Option<u32>,

    /// Global grid columns.
    #[arg(long = "cols")]
    pub cols: Option<u32>,
    /// Global grid rows.
    #[arg(long = "rows")]
    pub rows: Option<u32>,

    /// Neighborhood half-width `R`.
    #[arg(long = "radius")]
    pub radius: Option<u32>,
    /// Hysteresis width `ρ`.
    #[arg(long = "roughness")]
    pub roughness: Option<i32>,
    /// Initial wall fill percent, 0-100.
    #[arg(long = "fill")]
    pub fill: Option<u32>,

    /// Append a CSV metrics row to this file.
    #[arg(short = 'o')]
    pub results_file: Option<PathBuf>,

    /// Print configuration-file documentation, then exit.
    #[arg(long = "help-config")]
    pub help_config: bool,
}

mod defaults {
    use super::Color;

    pub const fn cols() -> u32 {
        128
    }
    pub const fn rows() -> u32 {
        128
    }
    pub const fn rand_seed() -> u64 {
        0
    }
    pub const fn last_generation() -> u32 {
        0
    }
    pub const fn show_graphics() -> bool {
        true
    }
    pub const fn is_parallel() -> bool {
        true
    }
    pub const fn x_threads() -> u32 {
        1
    }
    pub const fn y_threads() -> u32 {
        1
    }
    pub const fn results_file_path() -> Option<String> {
        None
    }
    pub const fn roughness() -> i32 {
        4
    }
    pub const fn neighbour_radius() -> u32 {
        1
    }
    pub const fn initial_fill_perc() -> u32 {
        45
    }
    pub const fn cell_size() -> Option<u32> {
        None
    }
    pub const fn cell_width() -> u32 {
        4
    }
    pub const fn cell_height() -> u32 {
        4
    }
    pub const fn draw_edges() -> bool {
        false
    }
    pub const fn draw_threads_grid() -> bool {
        false
    }
    pub const fn max_frame_rate() -> u32 {
        60
    }
    pub const fn wall_color() -> Color {
        [20, 20, 20]
    }
    pub const fn floor_color() -> Color {
        [210, 210, 210]
    }
    pub const fn threads_grid_color() -> Color {
        [200, 40, 40]
    }
}

/// The JSON config file's shape. Every field has a default, so a file
/// missing (or silently omitting) any key behaves exactly like the built-in
/// default for it.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "defaults::cols")]
    pub cols: u32,
    #[serde(default = "defaults::rows")]
    pub rows: u32,
    #[serde(default = "defaults::rand_seed")]
    pub rand_seed: u64,
    #[serde(default = "defaults::last_generation")]
    pub last_generation: u32,
    #[serde(default = "defaults::show_graphics")]
    pub show_graphics: bool,
    #[serde(default = "defaults::is_parallel")]
    pub is_parallel: bool,
    #[serde(default = "defaults::x_threads")]
    pub x_threads: u32,
    #[serde(default = "defaults::y_threads")]
    pub y_threads: u32,
    #[serde(default = "defaults::results_file_path")]
    pub results_file_path: Option<String>,
    #[serde(default = "defaults::roughness")]
    pub roughness: i32,
    #[serde(default = "defaults::neighbour_radius")]
    pub neighbour_radius: u32,
    #[serde(default = "defaults::initial_fill_perc")]
    pub initial_fill_perc: u32,
    /// Sets both `cell_width` and `cell_height` when present; an explicit
    /// `cell_width`/`cell_height` below overrides it.
    #[serde(default = "defaults::cell_size")]
    pub cell_size: Option<u32>,
    #[serde(default = "defaults::cell_width")]
    pub cell_width: u32,
    #[serde(default = "defaults::cell_height")]
    pub cell_height: u32,
    #[serde(default = "defaults::draw_edges")]
    pub draw_edges: bool,
    #[serde(default = "defaults::draw_threads_grid")]
    pub draw_threads_grid: bool,
    #[serde(default = "defaults::max_frame_rate")]
    pub max_frame_rate: u32,
    #[serde(default = "defaults::wall_color")]
    pub wall_color: Color,
    #[serde(default = "defaults::floor_color")]
    pub floor_color: Color,
    #[serde(default = "defaults::threads_grid_color")]
    pub threads_grid_color: Color,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cols: defaults::cols(),
            rows: defaults::rows(),
            rand_seed: defaults::rand_seed(),
            last_generation: defaults::last_generation(),
            show_graphics: defaults::show_graphics(),
            is_parallel: defaults::is_parallel(),
            x_threads: defaults::x_threads(),
            y_threads: defaults::y_threads(),
            results_file_path: defaults::results_file_path(),
            roughness: defaults::roughness(),
            neighbour_radius: defaults::neighbour_radius(),
            initial_fill_perc: defaults::initial_fill_perc(),
            cell_size: defaults::cell_size(),
            cell_width: defaults::cell_width(),
            cell_height: defaults::cell_height(),
            draw_edges: defaults::draw_edges(),
            draw_threads_grid: defaults::draw_threads_grid(),
            max_frame_rate: defaults::max_frame_rate(),
            wall_color: defaults::wall_color(),
            floor_color: defaults::floor_color(),
            threads_grid_color: defaults::threads_grid_color(),
        }
    }
}

/// 2D Cartesian process topology chosen for the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    Serial,
    Parallel { p_y: u32, p_x: u32 },
}

/// Rendering settings, present only when graphics are enabled.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphicsSettings {
    pub cell_width: u32,
    pub cell_height: u32,
    pub draw_edges: bool,
    pub draw_threads_grid: bool,
    pub max_frame_rate: u32,
    pub wall_color: Color,
    pub floor_color: Color,
    pub threads_grid_color: Color,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GraphicsMode {
    Headless,
    Graphic(GraphicsSettings),
}

/// Fully resolved, validated configuration for one run: CLI overrides
/// already merged over the config file, already merged over built-in
/// defaults.
#[derive(Clone, Debug)]
pub struct Config {
    pub rows: u32,
    pub cols: u32,
    pub rand_seed: u64,
    /// `None` means unbounded (run until canceled).
    pub last_generation: Option<u32>,
    pub roughness: i32,
    pub neighbour_radius: u32,
    pub initial_fill_perc: u32,
    pub results_file_path: Option<PathBuf>,
    pub mode: ExecutionMode,
    pub graphics: GraphicsMode,
    pub config_file_path: PathBuf,
}

impl Config {
    /// Load, merge, and validate the configuration for `args`.
    pub fn resolve(args: &CliArgs) -> Result<Self, CaveError> {
        let user_requested_path = args.config.as_path() != Path::new(DEFAULT_CONFIG_PATH);
        let file = Self::load_file(&args.config, user_requested_path)?;

        let cols = args.cols.unwrap_or(file.cols);
        let rows = args.rows.unwrap_or(file.rows);
        let neighbour_radius = args.radius.unwrap_or(file.neighbour_radius);
        let roughness = args.roughness.unwrap_or(file.roughness);
        let initial_fill_perc = args.fill.unwrap_or(file.initial_fill_perc);

        let is_parallel = if args.serial {
            false
        } else if args.parallel {
            true
        } else {
            file.is_parallel
        };
        let show_graphics = if args.no_graphic {
            false
        } else if args.graphic {
            true
        } else {
            file.show_graphics
        };

        let x_threads = args.x_threads.unwrap_or(file.x_threads);
        let y_threads = args.y_threads.unwrap_or(file.y_threads);
        let mode = if is_parallel {
            ExecutionMode::Parallel {
                p_y: y_threads,
                p_x: x_threads,
            }
        } else {
            ExecutionMode::Serial
        };

        let (cell_width, cell_height) = match file.cell_size {
            Some(size) => (size, size),
            None => (file.cell_width, file.cell_height),
        };
        let graphics = if show_graphics {
            GraphicsMode::Graphic(GraphicsSettings {
                cell_width,
                cell_height,
                draw_edges: file.draw_edges,
                draw_threads_grid: file.draw_threads_grid,
                max_frame_rate: file.max_frame_rate,
                wall_color: file.wall_color,
                floor_color: file.floor_color,
                threads_grid_color: file.threads_grid_color,
            })
        } else {
            GraphicsMode::Headless
        };

        let results_file_path = args
            .results_file
            .clone()
            .or_else(|| file.results_file_path.clone().map(PathBuf::from));

        let config = Self {
            rows,
            cols,
            rand_seed: file.rand_seed,
            last_generation: (file.last_generation != 0).then_some(file.last_generation),
            roughness,
            neighbour_radius,
            initial_fill_perc,
            results_file_path,
            mode,
            graphics,
            config_file_path: args.config.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path, user_requested: bool) -> Result<ConfigFile, CaveError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let file: ConfigFile = serde_json::from_str(&raw).map_err(|e| {
                    CaveError::Config(format!("malformed config file {}: {e}", path.display()))
                })?;
                info!(target: "config", path = %path.display(), "config_loaded");
                Ok(file)
            }
            Err(_) if !user_requested => {
                info!(
                    target: "config",
                    path = %path.display(),
                    "default_config_path_missing_using_builtin_defaults"
                );
                Ok(ConfigFile::default())
            }
            Err(_) => {
                warn!(target: "config", path = %path.display(), "requested_config_file_missing");
                if Self::prompt_continue_with_defaults()? {
                    Ok(ConfigFile::default())
                } else {
                    Err(CaveError::Config(format!(
                        "config file {} not found and user declined defaults",
                        path.display()
                    )))
                }
            }
        }
    }

    fn prompt_continue_with_defaults() -> Result<bool, CaveError> {
        print!("Config file not found. Continue with default configuration? (y/n) ");
        std::io::stdout()
            .flush()
            .map_err(|e| CaveError::Config(format!("failed to prompt on stdin: {e}")))?;
        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .map_err(|e| CaveError::Config(format!("failed to read stdin: {e}")))?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    fn validate(&self) -> Result<(), CaveError> {
        if self.initial_fill_perc > 100 {
            return Err(CaveError::Config(format!(
                "initial_fill_perc must be 0..=100, got {}",
                self.initial_fill_perc
            )));
        }
        if let ExecutionMode::Parallel { p_y, p_x } = self.mode {
            if p_y < 1 || p_x < 1 {
                return Err(CaveError::Config(format!(
                    "mesh dimensions must be >= 1, got P_y={p_y} P_x={p_x}"
                )));
            }
            if self.rows % p_y != 0 {
                return Err(CaveError::Config(format!(
                    "rows {} is not divisible by P_y {p_y}",
                    self.rows
                )));
            }
            if self.cols % p_x != 0 {
                return Err(CaveError::Config(format!(
                    "cols {} is not divisible by P_x {p_x}",
                    self.cols
                )));
            }
        }
        if matches!(self.graphics, GraphicsMode::Graphic(_)) {
            let cells = u64::from(self.rows) * u64::from(self.cols);
            if cells > MAX_CELLS_FOR_GRAPHICS {
                return Err(CaveError::Config(format!(
                    "grid of {cells} cells exceeds the {MAX_CELLS_FOR_GRAPHICS}-cell graphics cap"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            graphic: false,
            no_graphic: true,
            parallel: false,
            serial: false,
            x_threads: None,
            y_threads: None,
            cols: Some(10),
            rows: Some(10),
            radius: Some(1),
            roughness: Some(1),
            fill: Some(50),
            results_file: None,
            help_config: false,
        }
    }

    #[test]
    fn missing_default_path_falls_back_silently() {
        let args = base_args();
        let cfg = Config::resolve(&args).expect("default-path fallback must not error");
        assert_eq!(cfg.cols, 10);
        assert_eq!(cfg.rows, 10);
        assert_eq!(cfg.neighbour_radius, 1);
        assert_eq!(cfg.roughness, 1);
    }

    #[test]
    fn cli_flags_override_builtin_defaults() {
        let args = base_args();
        let cfg = Config::resolve(&args).unwrap();
        assert_eq!(cfg.initial_fill_perc, 50);
        assert_eq!(cfg.mode, ExecutionMode::Serial);
    }

    #[test]
    fn rejects_non_divisible_mesh() {
        let mut args = base_args();
        args.cols = Some(10);
        args.rows = Some(10);
        args.parallel = true;
        args.x_threads = Some(3);
        args.y_threads = Some(1);
        let err = Config::resolve(&args).unwrap_err();
        assert!(matches!(err, CaveError::Config(_)));
    }

    #[test]
    fn rejects_grid_too_large_for_graphics() {
        let mut args = base_args();
        args.no_graphic = false;
        args.graphic = true;
        args.cols = Some(2000);
        args.rows = Some(2000);
        let err = Config::resolve(&args).unwrap_err();
        assert!(matches!(err, CaveError::Config(_)));
    }

    #[test]
    fn missing_requested_config_file_is_an_error_path_when_run_non_interactively() {
        let mut args = base_args();
        args.config = PathBuf::from("/nonexistent/path/does-not-exist.cfg");
        // stdin isn't a tty in test harnesses, so the prompt reads EOF and
        // `answer.trim()` is empty, which is neither "y" nor "yes".
        let err = Config::resolve(&args).unwrap_err();
        assert!(matches!(err, CaveError::Config(_)));
    }

    #[test]
    fn cell_size_fans_out_to_width_and_height() {
        let file = ConfigFile {
            cell_size: Some(8),
            ..ConfigFile::default()
        };
        assert_eq!(file.cell_size, Some(8));
    }
}
