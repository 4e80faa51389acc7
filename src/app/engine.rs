//! The single owning value for one run: configuration, mesh, tile pair,
//! halo descriptors, transport, and metrics. Every phase function below
//! takes `&mut Engine` explicitly — there is no file-scope mutable state
//! anywhere in this crate.

use tracing::debug;

use crate::app::config::Config;
use crate::app::metrics::{FrameTiming, Metrics};
use crate::domain::{HaloDescriptors, LocalStepper, Mesh, RuleParams, TilePair};
use crate::net::{self, exchange::HaloExchange, Transport};

pub struct Engine {
    pub config: Config,
    pub mesh: Mesh,
    pub tiles: TilePair,
    pub descriptors: HaloDescriptors,
    pub transport: Box<dyn Transport>,
    pub stepper: LocalStepper,
    pub metrics: Metrics,
    generation: u32,
}

impl Engine {
    pub fn new(config: Config, mesh: Mesh, transport: Box<dyn Transport>) -> Self {
        let (p_y, p_x) = mesh.shape();
        let inner_rows = (config.rows / p_y) as usize;
        let inner_cols = (config.cols / p_x) as usize;
        let radius = config.neighbour_radius as usize;

        let tiles = TilePair::new(inner_rows, inner_cols, radius);
        let descriptors = HaloDescriptors::new(inner_rows, inner_cols, radius);
        let stepper = LocalStepper::new(RuleParams {
            radius,
            roughness: config.roughness,
        });

        Self {
            config,
            mesh,
            tiles,
            descriptors,
            transport,
            stepper,
            metrics: Metrics::start(),
            generation: 0,
        }
    }

    pub const fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_root(&self) -> bool {
        self.transport.is_root()
    }

    /// Distribute the initial grid: root builds it deterministically from
    /// `config.rand_seed`, every rank scatters into its own tile's inner
    /// region, then copies `read` into `write` so both start identical.
    pub fn scatter_initial(&mut self) {
        let (p_y, p_x) = self.mesh.shape();
        let root_grid = self.is_root().then(|| {
            net::scatter_gather::build_initial_grid(
                self.config.rows,
                self.config.cols,
                p_y,
                p_x,
                self.config.initial_fill_perc,
                self.config.rand_seed,
            )
        });
        net::scatter_gather::scatter(
            self.transport.as_ref(),
            &mut self.tiles.read,
            root_grid.as_deref(),
        );
        self.tiles.write.copy_inner_from(&self.tiles.read);
        debug!(target: "engine", rank = self.transport.rank(), "scatter_complete");
    }

    /// Gather every rank's inner region back to root, concatenated in rank
    /// order. Returns `Some` only on root.
    pub fn gather_for_render(&self) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        net::scatter_gather::gather(
            self.transport.as_ref(),
            &self.tiles.read,
            self.is_root().then_some(&mut out),
        );
        self.is_root().then_some(out)
    }

    /// Synchronize `read`'s halo with every existing neighbor: issues this
    /// generation's sends, then blocks on the matching receives. Correct for
    /// any transport where ranks run concurrently (MPI, single-process); a
    /// harness simulating several ranks on one thread must instead drive
    /// [`exchange_halo_send`](Self::exchange_halo_send) across every rank
    /// before [`exchange_halo_recv`](Self::exchange_halo_recv) on any of
    /// them — see [`HaloExchange::run`].
    pub fn exchange_halo(&mut self) {
        self.exchange_halo_send();
        self.exchange_halo_recv();
    }

    /// Issue this generation's halo sends without waiting on the matching
    /// receives.
    pub fn exchange_halo_send(&self) {
        HaloExchange::send(
            self.transport.as_ref(),
            &self.mesh,
            &self.descriptors,
            &self.tiles.read,
        );
    }

    /// Block on this generation's halo receives. Every neighbor that could
    /// send to this tile must have already called
    /// [`exchange_halo_send`](Self::exchange_halo_send) this generation.
    pub fn exchange_halo_recv(&mut self) {
        HaloExchange::recv(
            self.transport.as_ref(),
            &self.mesh,
            &self.descriptors,
            &mut self.tiles.read,
        );
    }

    /// One generation: step `read` into `write`, then swap. The halo
    /// exchange must have already populated `read`'s ghost cells for this
    /// generation before calling this.
    pub fn step(&mut self) {
        self.stepper.step(&self.tiles.read, &mut self.tiles.write);
        self.tiles.swap();
        self.generation += 1;
    }

    pub fn record_frame(&mut self, timing: FrameTiming) {
        self.metrics.record_frame(timing);
    }

    /// Whether the run should stop advancing generations.
    pub fn generation_limit_reached(&self) -> bool {
        match self.config.last_generation {
            Some(limit) => self.generation >= limit,
            None => false,
        }
    }
}
