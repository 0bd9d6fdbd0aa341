//! Forwarding Information Base entries.

use serde::Serialize;
use std::net::SocketAddr;

/// A route: Interests under the entry's prefix may be forwarded to `next_hop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FibEntry {
    /// Neighbour to forward to
    pub next_hop: SocketAddr,

    /// Distance to the producer, informational only
    pub hops: u32,
}

impl FibEntry {
    pub fn new(next_hop: SocketAddr, hops: u32) -> Self {
        Self { next_hop, hops }
    }
}
