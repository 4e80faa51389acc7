//! An in-memory, single-threaded stand-in for the messaging substrate, used
//! by tests that exercise multi-rank protocol logic (halo exchange, scatter,
//! gather) without an actual MPI runtime. Every [`SimTransport`] for a given
//! run shares one [`SimNetwork`]; a test plays the role of the scheduler,
//! driving each rank's phase calls in turn — the same "sends enqueued before
//! receives drain them" ordering a real run relies on, just serialized onto
//! one thread instead of `N` processes.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use super::{SendBatch, Transport};

const SCATTER_TAG: i32 = -1;
const GATHER_TAG: i32 = -2;

type Key = (i32, i32, i32); // (source, dest, tag)

#[derive(Default)]
pub struct SimNetwork {
    queues: RefCell<HashMap<Key, VecDeque<Vec<u8>>>>,
}

impl SimNetwork {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn push(&self, key: Key, data: Vec<u8>) {
        self.queues.borrow_mut().entry(key).or_default().push_back(data);
    }

    fn pop(&self, key: Key) -> Vec<u8> {
        self.queues
            .borrow_mut()
            .get_mut(&key)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| panic!("sim transport: no message queued for {key:?}"))
    }
}

/// One simulated rank's view of a [`SimNetwork`].
pub struct SimTransport {
    net: Rc<SimNetwork>,
    rank: i32,
    size: i32,
}

impl SimTransport {
    pub fn new(net: Rc<SimNetwork>, rank: i32, size: i32) -> Self {
        Self { net, rank, size }
    }
}

struct SimSendBatch<'a> {
    net: &'a SimNetwork,
    rank: i32,
}

impl SendBatch for SimSendBatch<'_> {
    fn send(&mut self, dest: i32, tag: i32, data: Vec<u8>) {
        self.net.push((self.rank, dest, tag), data);
    }
}

impl Transport for SimTransport {
    fn rank(&self) -> i32 {
        self.rank
    }

    fn size(&self) -> i32 {
        self.size
    }

    fn send_phase(&self, issue: &mut dyn FnMut(&mut dyn SendBatch)) {
        let mut batch = SimSendBatch {
            net: &self.net,
            rank: self.rank,
        };
        issue(&mut batch);
        // Every send already landed in its queue synchronously above, so
        // there is nothing left to wait for here.
    }

    fn recv_into(&self, source: i32, tag: i32, buf: &mut [u8]) {
        let data = self.net.pop((source, self.rank, tag));
        debug_assert_eq!(data.len(), buf.len());
        buf.copy_from_slice(&data);
    }

    fn scatter_root(&self, send_buf: &[u8], recv_buf: &mut [u8]) {
        let chunk = recv_buf.len();
        recv_buf.copy_from_slice(&send_buf[0..chunk]);
        for dest in 1..self.size {
            let start = dest as usize * chunk;
            self.net.push(
                (0, dest, SCATTER_TAG),
                send_buf[start..start + chunk].to_vec(),
            );
        }
    }

    fn scatter_recv(&self, recv_buf: &mut [u8]) {
        let data = self.net.pop((0, self.rank, SCATTER_TAG));
        recv_buf.copy_from_slice(&data);
    }

    fn gather_root(&self, send_buf: &[u8], recv_buf: &mut [u8]) {
        let chunk = send_buf.len();
        recv_buf[0..chunk].copy_from_slice(send_buf);
        for src in 1..self.size {
            let data = self.net.pop((src, 0, GATHER_TAG));
            let start = src as usize * chunk;
            recv_buf[start..start + chunk].copy_from_slice(&data);
        }
    }

    fn gather_send(&self, send_buf: &[u8]) {
        self.net.push((self.rank, 0, GATHER_TAG), send_buf.to_vec());
    }

    fn abort(&self, code: i32) -> ! {
        panic!("sim transport abort requested with code {code}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_to_point_send_then_recv_round_trips() {
        let net = SimNetwork::new();
        let a = SimTransport::new(net.clone(), 0, 2);
        let b = SimTransport::new(net, 1, 2);

        a.send_phase(&mut |batch| batch.send(1, 7, vec![1, 2, 3]));
        let mut buf = vec![0u8; 3];
        b.recv_into(0, 7, &mut buf);
        assert_eq!(buf, vec![1, 2, 3]);
    }

    #[test]
    fn scatter_then_gather_round_trips_per_rank_chunk() {
        let net = SimNetwork::new();
        let root = SimTransport::new(net.clone(), 0, 3);
        let r1 = SimTransport::new(net.clone(), 1, 3);
        let r2 = SimTransport::new(net, 2, 3);

        let send = vec![10u8, 20, 30];
        let mut root_recv = vec![0u8; 1];
        root.scatter_root(&send, &mut root_recv);
        assert_eq!(root_recv, vec![10]);

        let mut r1_recv = vec![0u8; 1];
        r1.scatter_recv(&mut r1_recv);
        assert_eq!(r1_recv, vec![20]);

        let mut r2_recv = vec![0u8; 1];
        r2.scatter_recv(&mut r2_recv);
        assert_eq!(r2_recv, vec![30]);

        let mut gathered = vec![0u8; 3];
        r1.gather_send(&r1_recv);
        r2.gather_send(&r2_recv);
        root.gather_root(&root_recv, &mut gathered);
        assert_eq!(gathered, send);
    }
}
