//! Serial-mode transport: rank 0 of 1. [`Mesh::single`](crate::domain::Mesh::single)
//! guarantees every direction resolves to the sentinel, so
//! [`HaloExchange`](super::HaloExchange) never actually calls `send`/`recv_into`
//! on this transport — it exists so the serial and parallel drivers can share
//! one code path instead of branching on mode everywhere.

use super::{SendBatch, Transport};

pub struct SingleProcessTransport;

struct NoopBatch;

impl SendBatch for NoopBatch {
    fn send(&mut self, dest: i32, _tag: i32, _data: Vec<u8>) {
        unreachable!("single-process mesh has no neighbors to send {dest} to");
    }
}

impl Transport for SingleProcessTransport {
    fn rank(&self) -> i32 {
        0
    }

    fn size(&self) -> i32 {
        1
    }

    fn send_phase(&self, issue: &mut dyn FnMut(&mut dyn SendBatch)) {
        issue(&mut NoopBatch);
    }

    fn recv_into(&self, source: i32, _tag: i32, _buf: &mut [u8]) {
        unreachable!("single-process mesh has no neighbor at rank {source}");
    }

    fn scatter_root(&self, send_buf: &[u8], recv_buf: &mut [u8]) {
        recv_buf.copy_from_slice(send_buf);
    }

    fn scatter_recv(&self, _recv_buf: &mut [u8]) {
        unreachable!("serial mode always scatters via scatter_root");
    }

    fn gather_root(&self, send_buf: &[u8], recv_buf: &mut [u8]) {
        recv_buf.copy_from_slice(send_buf);
    }

    fn gather_send(&self, _send_buf: &[u8]) {
        unreachable!("serial mode always gathers via gather_root");
    }

    fn abort(&self, code: i32) -> ! {
        std::process::exit(code);
    }
}
