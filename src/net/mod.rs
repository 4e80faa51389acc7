//! The messaging seam: everything above this module (scatter/gather, halo
//! exchange) is written against the [`Transport`] trait, never against a
//! concrete substrate directly. [`MpiTransport`] backs real distributed
//! runs, [`SingleProcessTransport`] backs serial mode (never actually
//! exercised, since a single process has no neighbors to talk to), and
//! [`sim::SimTransport`] backs the multi-rank unit tests.

pub mod exchange;
pub mod mpi_transport;
pub mod scatter_gather;
pub mod sim;
pub mod single;

pub use exchange::HaloExchange;
pub use mpi_transport::MpiTransport;
pub use scatter_gather::{gather, scatter};
pub use single::SingleProcessTransport;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("messaging substrate reported a failure: {0}")]
    Failed(String),
}

/// One batch of non-blocking sends issued within a single generation's halo
/// exchange. Every send queued into a batch is guaranteed complete by the
/// time [`Transport::send_phase`] returns — mirroring the "request-scope"
/// pattern of the messaging substrate (all requests posted, then waited as
/// a group at scope exit) rather than an explicit per-request wait call.
pub trait SendBatch {
    /// Queue a non-blocking send of `data` to `dest` under `tag`. `data` is
    /// consumed because it is the value a non-blocking send keeps alive
    /// until completion; callers must not need the buffer back.
    fn send(&mut self, dest: i32, tag: i32, data: Vec<u8>);
}

/// The point-to-point and collective primitives the core needs. Modeled
/// tightly on what [`super::exchange::HaloExchange`] and
/// [`super::scatter_gather`] actually call, not on MPI's full surface.
pub trait Transport {
    fn rank(&self) -> i32;
    fn size(&self) -> i32;

    fn is_root(&self) -> bool {
        self.rank() == 0
    }

    /// Run `issue` once, giving it a [`SendBatch`] to queue this
    /// generation's non-blocking sends into. All of them are issued before
    /// any matching blocking receive is awaited (so every destination's
    /// receive can make progress without its sender having to wait on it
    /// first), and are guaranteed complete by the time this call returns.
    fn send_phase(&self, issue: &mut dyn FnMut(&mut dyn SendBatch));

    /// Blocking receive of exactly `buf.len()` bytes from `source` tagged
    /// `tag`, overwriting `buf`.
    fn recv_into(&self, source: i32, tag: i32, buf: &mut [u8]);

    /// Root-side scatter: `send_buf` holds `size()` concatenated chunks of
    /// `recv_buf.len()` bytes each, in rank order; this call both
    /// distributes the non-root chunks and copies the root's own chunk into
    /// `recv_buf`.
    fn scatter_root(&self, send_buf: &[u8], recv_buf: &mut [u8]);

    /// Non-root side of a scatter: blocks until the root has sent this
    /// rank's chunk, writing it into `recv_buf`.
    fn scatter_recv(&self, recv_buf: &mut [u8]);

    /// Root-side gather: collects every rank's `send_buf`-sized chunk
    /// (including the root's own) into `recv_buf`, concatenated in rank
    /// order.
    fn gather_root(&self, send_buf: &[u8], recv_buf: &mut [u8]);

    /// Non-root side of a gather: sends `send_buf` to the root.
    fn gather_send(&self, send_buf: &[u8]);

    /// Tear down every rank in the job immediately. Never returns.
    fn abort(&self, code: i32) -> !;
}
