//! Outbound packet queues.
//!
//! A link drains exactly one queue. Queues are bounded; a packet offered
//! to a full queue is dropped without any signal to the sender.

use rust_ccn_common::Packet;
use std::collections::VecDeque;
use std::time::Instant;

/// Default number of packets a link queue holds.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Outcome of offering a packet to a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The packet was queued, possibly after being marked.
    Queued { marked: bool },
    /// The queue was full and the packet was discarded.
    Dropped,
}

impl Admission {
    pub fn is_queued(&self) -> bool {
        matches!(self, Admission::Queued { .. })
    }
}

/// Bounded FIFO discipline behind a link.
pub trait PacketQueue: Send {
    /// Offer a packet at time `now`.
    fn enqueue(&mut self, packet: Packet, now: Instant) -> Admission;

    /// Take the oldest packet, if any.
    fn dequeue(&mut self, now: Instant) -> Option<Packet>;

    /// Number of packets currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count queued packets accepted by `predicate`.
    fn count_matching(&self, predicate: &dyn Fn(&Packet) -> bool) -> usize;
}

/// Plain drop-tail FIFO.
#[derive(Debug)]
pub struct FifoQueue {
    packets: VecDeque<Packet>,
    capacity: usize,
}

impl FifoQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            packets: VecDeque::new(),
            capacity,
        }
    }
}

impl Default for FifoQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl PacketQueue for FifoQueue {
    fn enqueue(&mut self, packet: Packet, _now: Instant) -> Admission {
        if self.packets.len() >= self.capacity {
            return Admission::Dropped;
        }
        self.packets.push_back(packet);
        Admission::Queued { marked: false }
    }

    fn dequeue(&mut self, _now: Instant) -> Option<Packet> {
        self.packets.pop_front()
    }

    fn len(&self) -> usize {
        self.packets.len()
    }

    fn count_matching(&self, predicate: &dyn Fn(&Packet) -> bool) -> usize {
        self.packets.iter().filter(|packet| predicate(packet)).count()
    }
}
