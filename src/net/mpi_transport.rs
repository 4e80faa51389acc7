//! [`Transport`] backed by the real MPI runtime via the `mpi` crate.
//!
//! Non-blocking sends are issued with [`mpi::request::scope`]: every send
//! for a generation's halo exchange is registered inside one scope, and the
//! scope's own exit — not an explicit per-request wait from the caller — is
//! where the runtime guarantees every queued send has completed. That lines
//! up exactly with [`Transport::send_phase`]'s contract: sends are
//! guaranteed complete once it returns, before
//! [`HaloExchange::run`](super::HaloExchange::run) starts awaiting receives.

use mpi::environment::Universe;
use mpi::point_to_point::{Destination, Source};
use mpi::request::{LocalScope, Request};
use mpi::topology::{Communicator, Rank, SimpleCommunicator};
use mpi::Tag;

use super::{SendBatch, Transport};

/// Owns the MPI runtime handle for the process's lifetime; dropping it
/// finalizes MPI. Held by the binary's `main`, which hands a [`MpiTransport`]
/// (borrowing the communicator) down into the engine.
pub struct MpiEnvironment {
    _universe: Universe,
    world: SimpleCommunicator,
}

impl MpiEnvironment {
    /// Initialize MPI. Returns `None` if the runtime could not be started
    /// (no `mpirun`/`mpiexec` launcher, or the substrate itself failed) —
    /// the caller treats that as a fatal messaging error.
    pub fn init() -> Option<Self> {
        let universe = mpi::initialize()?;
        let world = universe.world();
        Some(Self {
            _universe: universe,
            world,
        })
    }

    pub fn size(&self) -> i32 {
        self.world.size()
    }

    /// `SimpleCommunicator` is a thin, `Copy` handle onto the underlying
    /// `MPI_Comm`, so the returned [`MpiTransport`] owns its communicator
    /// outright instead of borrowing from `self` — keeping it (and the
    /// `Box<dyn Transport>` the engine stores it behind) free of a lifetime
    /// parameter tied to this environment's stack frame.
    pub fn transport(&self) -> MpiTransport {
        MpiTransport { world: self.world }
    }
}

#[derive(Clone, Copy)]
pub struct MpiTransport {
    world: SimpleCommunicator,
}

struct MpiSendBatch<'scope, 'buf> {
    world: SimpleCommunicator,
    scope: &'scope LocalScope<'scope>,
    requests: Vec<Request<'scope, 'buf, Vec<u8>>>,
}

impl<'scope, 'buf> SendBatch for MpiSendBatch<'scope, 'buf> {
    fn send(&mut self, dest: i32, tag: i32, data: Vec<u8>) {
        let process = self.world.process_at_rank(dest as Rank);
        let request = process.immediate_send_with_tag(self.scope, data, tag as Tag);
        self.requests.push(request);
    }
}

impl Transport for MpiTransport {
    fn rank(&self) -> i32 {
        self.world.rank()
    }

    fn size(&self) -> i32 {
        self.world.size()
    }

    fn send_phase(&self, issue: &mut dyn FnMut(&mut dyn SendBatch)) {
        mpi::request::scope(|scope| {
            let mut batch = MpiSendBatch {
                world: self.world,
                scope,
                requests: Vec::with_capacity(8),
            };
            issue(&mut batch);
            // Waiting here (rather than relying solely on scope teardown)
            // keeps completion observable and in our control, while still
            // happening entirely inside the scope the requests were opened
            // in — the scope itself would refuse to end with any of them
            // still outstanding.
            for request in batch.requests.drain(..) {
                let _ = request.wait();
            }
        });
    }

    fn recv_into(&self, source: i32, tag: i32, buf: &mut [u8]) {
        let process = self.world.process_at_rank(source as Rank);
        process.receive_into_with_tag(buf, tag as Tag);
    }

    fn scatter_root(&self, send_buf: &[u8], recv_buf: &mut [u8]) {
        let root_process = self.world.process_at_rank(self.rank() as Rank);
        root_process.scatter_into_root(send_buf, recv_buf);
    }

    fn scatter_recv(&self, recv_buf: &mut [u8]) {
        let root_process = self.world.process_at_rank(0);
        root_process.scatter_into(recv_buf);
    }

    fn gather_root(&self, send_buf: &[u8], recv_buf: &mut [u8]) {
        let root_process = self.world.process_at_rank(self.rank() as Rank);
        root_process.gather_into_root(send_buf, recv_buf);
    }

    fn gather_send(&self, send_buf: &[u8]) {
        let root_process = self.world.process_at_rank(0);
        root_process.gather_into(send_buf);
    }

    fn abort(&self, code: i32) -> ! {
        self.world.abort(code);
    }
}
