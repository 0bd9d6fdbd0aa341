//! Flow publisher.

use log::info;
use rust_ccn_common::{Data, Name, Packet, Result};
use rust_ccn_forwarder::Node;
use std::net::SocketAddr;
use std::time::Duration;

/// Wire size of a published Data packet: a 1500-byte frame less the framing overhead.
pub const DEFAULT_DATA_WIRE_SIZE: usize = 1500 - 36;

/// Pushes a numbered sequence of Data packets toward its first hop.
pub struct Publisher {
    node: Node,
    first_hop: SocketAddr,
    flow: Name,
}

impl Publisher {
    pub fn new(node: Node, first_hop: SocketAddr, flow: Name) -> Self {
        Self {
            node,
            first_hop,
            flow,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Queue `flow/0 .. flow/{count-1}`, each encoded to `wire_size` bytes.
    ///
    /// Returns the number of packets the first-hop queue accepted.
    pub fn publish(&self, count: u64, wire_size: usize) -> Result<u64> {
        let mut queued = 0;
        for i in 0..count {
            let data = Data::with_wire_size(self.flow.child([i.to_string()]), wire_size);
            if self.node.send(self.first_hop, Packet::data(data))?.is_queued() {
                queued += 1;
            }
        }
        info!(
            "[Publisher {}] Queued {} of {} packets under {}",
            self.node.name(),
            queued,
            count,
            self.flow
        );
        Ok(queued)
    }

    /// Wait until the transport has sent every packet the links accepted.
    pub async fn drained(&self) {
        while self.node.links().any(|link| link.unsent() > 0) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
