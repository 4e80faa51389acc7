//! The root-only renderer adapter: paints the gathered global grid through
//! `macroquad`. The core never calls a drawing primitive directly — only
//! through [`MacroquadRenderer`]'s [`FrameSink`](crate::app::driver::FrameSink)
//! implementation, and only root ever owns one.

use macroquad::prelude::*;

use crate::app::config::{Config, ExecutionMode, GraphicsMode, GraphicsSettings};
use crate::app::driver::FrameSink;
use crate::app::pacer::{PaceDecision, Pacer};
use crate::app::Engine;
use crate::error::CaveError;

fn to_macroquad_color(c: [u8; 3]) -> Color {
    Color::from_rgba(c[0], c[1], c[2], 255)
}

/// Window size and title for the run, used to build the `Conf` passed to
/// `#[macroquad::main]`'s window-config hook.
pub fn window_conf(config: &Config) -> Conf {
    let settings = match &config.graphics {
        GraphicsMode::Graphic(s) => s.clone(),
        GraphicsMode::Headless => GraphicsSettings {
            cell_width: 4,
            cell_height: 4,
            draw_edges: false,
            draw_threads_grid: false,
            max_frame_rate: 60,
            wall_color: [0, 0, 0],
            floor_color: [255, 255, 255],
            threads_grid_color: [255, 0, 0],
        },
    };
    Conf {
        window_title: "cave-gen".to_owned(),
        window_width: (config.cols * settings.cell_width) as i32,
        window_height: (config.rows * settings.cell_height) as i32,
        ..Default::default()
    }
}

/// Paints one filled rectangle per floor cell over a background pre-cleared
/// to wall color; optionally overlays per-cell borders and a tile grid.
pub struct MacroquadRenderer {
    p_y: u32,
    p_x: u32,
    inner_rows: usize,
    inner_cols: usize,
    settings: GraphicsSettings,
}

impl MacroquadRenderer {
    pub fn new(config: &Config, inner_rows: usize, inner_cols: usize) -> Option<Self> {
        let settings = match &config.graphics {
            GraphicsMode::Graphic(s) => s.clone(),
            GraphicsMode::Headless => return None,
        };
        let (p_y, p_x) = match config.mode {
            ExecutionMode::Parallel { p_y, p_x } => (p_y, p_x),
            ExecutionMode::Serial => (1, 1),
        };
        Some(Self {
            p_y,
            p_x,
            inner_rows,
            inner_cols,
            settings,
        })
    }

    /// `true` when the user closed the window or released any key — a
    /// plain, synchronous poll of macroquad's input state, independent of
    /// the frame-boundary wait performed separately in [`run_graphic`].
    pub fn cancel_requested() -> bool {
        is_quit_requested() || get_last_key_released().is_some()
    }

    /// Minimum wall-clock budget per frame implied by `max_frame_rate`; `0`
    /// disables the cap (macroquad's own vsync/event-loop pacing applies).
    pub fn frame_budget(&self) -> std::time::Duration {
        if self.settings.max_frame_rate == 0 {
            std::time::Duration::ZERO
        } else {
            std::time::Duration::from_secs_f64(1.0 / self.settings.max_frame_rate as f64)
        }
    }
}

impl FrameSink for MacroquadRenderer {
    fn begin_frame(&mut self) {
        clear_background(to_macroquad_color(self.settings.wall_color));
    }

    fn draw(&mut self, grid: &[u8]) {
        let cw = self.settings.cell_width as f32;
        let ch = self.settings.cell_height as f32;
        let floor_color = to_macroquad_color(self.settings.floor_color);
        let tile_grid_color = to_macroquad_color(self.settings.threads_grid_color);
        let tile_len = self.inner_rows * self.inner_cols;

        for rank in 0..(self.p_y * self.p_x) as usize {
            let cy = (rank as u32 / self.p_x) as usize;
            let cx = (rank as u32 % self.p_x) as usize;
            let tile = &grid[rank * tile_len..(rank + 1) * tile_len];

            for y in 0..self.inner_rows {
                for x in 0..self.inner_cols {
                    if tile[y * self.inner_cols + x] == 0 {
                        let gx = (cx * self.inner_cols + x) as f32 * cw;
                        let gy = (cy * self.inner_rows + y) as f32 * ch;
                        draw_rectangle(gx, gy, cw, ch, floor_color);
                        if self.settings.draw_edges {
                            draw_rectangle_lines(gx, gy, cw, ch, 1.0, BLACK);
                        }
                    }
                }
            }

            if self.settings.draw_threads_grid {
                let gx = (cx * self.inner_cols) as f32 * cw;
                let gy = (cy * self.inner_rows) as f32 * ch;
                draw_rectangle_lines(
                    gx,
                    gy,
                    self.inner_cols as f32 * cw,
                    self.inner_rows as f32 * ch,
                    2.0,
                    tile_grid_color,
                );
            }
        }
    }

    fn end_frame(&mut self) {}
}

/// Root's graphics-enabled generation loop.
///
/// Composes the same [`Engine`] phase methods
/// [`crate::app::driver::run`] does — scatter once, then per frame: gather,
/// paint, halo exchange, step — but additionally awaits `next_frame()` at
/// the end of every iteration, since that is macroquad's frame-boundary
/// primitive and is inherently async; `driver::run` is kept synchronous so
/// headless runs and every non-root rank (which never touches the display)
/// don't need an async runtime at all. `pacer` is expected to be a
/// [`crate::app::pacer::GraphicPacer`] built from [`poll_pace_decision`].
pub async fn run_graphic(
    engine: &mut Engine,
    renderer: &mut MacroquadRenderer,
    pacer: &mut impl Pacer,
) -> Result<(), CaveError> {
    engine.scatter_initial();

    loop {
        if engine.generation_limit_reached() {
            break;
        }
        if pacer.may_step() == PaceDecision::Cancel {
            return Err(CaveError::UserInterrupt);
        }

        let frame_start = std::time::Instant::now();

        let draw_start = std::time::Instant::now();
        renderer.begin_frame();
        if let Some(grid) = engine.gather_for_render() {
            renderer.draw(&grid);
        }
        renderer.end_frame();
        let draw_elapsed = draw_start.elapsed();

        let comm_start = std::time::Instant::now();
        engine.exchange_halo();
        let comm_elapsed = comm_start.elapsed();

        let compute_start = std::time::Instant::now();
        engine.step();
        let compute_elapsed = compute_start.elapsed();

        engine.record_frame(crate::app::metrics::FrameTiming {
            communication: comm_elapsed,
            computation: compute_elapsed,
            drawing: draw_elapsed,
            total: frame_start.elapsed(),
        });

        let budget = renderer.frame_budget();
        let elapsed = frame_start.elapsed();
        if budget > elapsed {
            std::thread::sleep(budget - elapsed);
        }

        next_frame().await;
    }

    Ok(())
}

/// Returns [`PaceDecision::Cancel`] exactly when [`MacroquadRenderer::cancel_requested`]
/// does; kept as a free function so a [`crate::app::pacer::GraphicPacer`] can
/// be built from it without this module depending on `app::pacer` more than
/// necessary.
pub fn poll_pace_decision() -> PaceDecision {
    if MacroquadRenderer::cancel_requested() {
        PaceDecision::Cancel
    } else {
        PaceDecision::Advance
    }
}
