//! Per-frame timing and the results-CSV writer.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::app::config::{Config, ExecutionMode, GraphicsMode};
use crate::error::CaveError;

/// The four durations measured once per frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameTiming {
    pub communication: Duration,
    pub computation: Duration,
    pub drawing: Duration,
    pub total: Duration,
}

/// Accumulates [`FrameTiming`] across the whole run and renders the
/// results-CSV row described in §6.
pub struct Metrics {
    run_start_instant: Instant,
    run_start_wall: SystemTime,
    communication_time: Duration,
    generation_time: Duration,
    draw_time: Duration,
    frame_count: u64,
}

impl Metrics {
    pub fn start() -> Self {
        Self {
            run_start_instant: Instant::now(),
            run_start_wall: SystemTime::now(),
            communication_time: Duration::ZERO,
            generation_time: Duration::ZERO,
            draw_time: Duration::ZERO,
            frame_count: 0,
        }
    }

    pub fn record_frame(&mut self, timing: FrameTiming) {
        self.communication_time += timing.communication;
        self.generation_time += timing.computation;
        self.draw_time += timing.drawing;
        self.frame_count += 1;
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn total_time(&self) -> Duration {
        self.run_start_instant.elapsed()
    }

    /// Append one CSV row to `path`, writing the header first if the file
    /// doesn't already exist (or is empty).
    pub fn write_csv(&self, path: &Path, config: &Config, n_procs: u32) -> Result<(), CaveError> {
        let needs_header = !path.exists() || path.metadata().map(|m| m.len() == 0).unwrap_or(true);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| CaveError::Config(format!("cannot open results file {}: {e}", path.display())))?;

        if needs_header {
            writeln!(
                file,
                "total_time,communication_time,generation_time,draw_time,start_time,end_time,\
                 show_graphics,is_parallel,n_procs,x_threads,y_threads,cols,rows,radius,roughness,\
                 config_file_path"
            )
            .map_err(|e| CaveError::Config(format!("cannot write results header: {e}")))?;
        }

        let end_time = SystemTime::now();
        let start_secs = self
            .run_start_wall
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        let end_secs = end_time
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();

        let (show_graphics, is_parallel, x_threads, y_threads) = match (&config.graphics, &config.mode) {
            (g, ExecutionMode::Parallel { p_y, p_x }) => (matches!(g, GraphicsMode::Graphic(_)), true, *p_x, *p_y),
            (g, ExecutionMode::Serial) => (matches!(g, GraphicsMode::Graphic(_)), false, 1, 1),
        };

        writeln!(
            file,
            "{total:.6},{comm:.6},{gen:.6},{draw:.6},{start:.6},{end:.6},{graphics},{parallel},\
             {n_procs},{x},{y},{cols},{rows},{radius},{roughness},{config_path}",
            total = self.total_time().as_secs_f64(),
            comm = self.communication_time.as_secs_f64(),
            gen = self.generation_time.as_secs_f64(),
            draw = self.draw_time.as_secs_f64(),
            start = start_secs,
            end = end_secs,
            graphics = show_graphics,
            parallel = is_parallel,
            n_procs = n_procs,
            x = x_threads,
            y = y_threads,
            cols = config.cols,
            rows = config.rows,
            radius = config.neighbour_radius,
            roughness = config.roughness,
            config_path = config.config_file_path.display(),
        )
        .map_err(|e| CaveError::Config(format!("cannot write results row: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::{CliArgs, Config};
    use std::path::PathBuf;

    fn cfg() -> Config {
        let args = CliArgs {
            config: PathBuf::from("./config/default.cfg"),
            graphic: false,
            no_graphic: true,
            parallel: false,
            serial: true,
            x_threads: None,
            y_threads: None,
            cols: Some(8),
            rows: Some(8),
            radius: Some(1),
            roughness: Some(1),
            fill: Some(40),
            results_file: None,
            help_config: false,
        };
        Config::resolve(&args).unwrap()
    }

    #[test]
    fn writes_header_once_and_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let config = cfg();

        let mut metrics = Metrics::start();
        metrics.record_frame(FrameTiming {
            communication: Duration::from_millis(1),
            computation: Duration::from_millis(2),
            drawing: Duration::ZERO,
            total: Duration::from_millis(3),
        });
        metrics.write_csv(&path, &config, 1).unwrap();
        metrics.write_csv(&path, &config, 1).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3, "one header + two data rows");
        assert!(lines[0].starts_with("total_time,communication_time"));
    }

    #[test]
    fn frame_count_tracks_recorded_frames() {
        let mut metrics = Metrics::start();
        assert_eq!(metrics.frame_count(), 0);
        metrics.record_frame(FrameTiming::default());
        metrics.record_frame(FrameTiming::default());
        assert_eq!(metrics.frame_count(), 2);
    }
}
