//! Datagram transports for CCN nodes.
//!
//! A transport moves opaque byte buffers between addressable endpoints
//! over an unordered, lossy channel. The node layers links, queues and
//! packet decoding on top; nothing here knows about packet formats.

use async_trait::async_trait;
use bytes::Bytes;
use rust_ccn_common::Result;
use std::net::SocketAddr;

mod memory;
mod udp;

pub use memory::{MemoryNetwork, MemoryTransport};
pub use udp::UdpTransport;

/// Largest datagram a transport will deliver.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Fire-and-forget datagram exchange between endpoints.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Address peers use to reach this endpoint.
    fn local_addr(&self) -> SocketAddr;

    /// Send `bytes` to `to`. Delivery is not guaranteed.
    async fn send(&self, to: SocketAddr, bytes: Bytes) -> Result<()>;

    /// Wait for the next datagram and return it with its sender.
    async fn recv(&self) -> Result<(SocketAddr, Bytes)>;
}
