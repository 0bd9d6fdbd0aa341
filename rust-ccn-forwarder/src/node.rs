//! A network endpoint with its outbound links.

use crate::link::{Link, LinkConfig};
use crate::queue::{Admission, PacketQueue};
use log::{debug, warn};
use rust_ccn_common::{metrics::NodeMetrics, wire, Error, Name, Packet, PacketType, Result};
use rust_ccn_transport::Transport;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// An endpoint that talks to its neighbours only through configured links.
///
/// Links are added during setup; afterwards the node is shared read-only
/// between the receive loop and whoever sends through it.
pub struct Node {
    /// Node name used in logs
    name: String,

    /// Datagram transport the node is bound to
    transport: Arc<dyn Transport>,

    /// Outbound links keyed by peer address
    links: HashMap<SocketAddr, Link>,

    /// Node metrics
    metrics: Arc<NodeMetrics>,
}

impl Node {
    pub fn new(name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            transport,
            links: HashMap::new(),
            metrics: Arc::new(NodeMetrics::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    /// Add a link and start its drain task. A second link to the same peer replaces the first.
    pub fn add_link(&mut self, config: LinkConfig, queue: Box<dyn PacketQueue>) {
        let peer = config.peer;
        let link = Link::spawn(config, queue, self.transport.clone(), self.metrics.clone());
        if self.links.insert(peer, link).is_some() {
            warn!("[Node {}] Replaced existing link to {}", self.name, peer);
        }
    }

    pub fn is_linked_to(&self, peer: SocketAddr) -> bool {
        self.links.contains_key(&peer)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Queue `packet` on the link toward `to`.
    pub fn send(&self, to: SocketAddr, packet: Packet) -> Result<Admission> {
        let link = self.links.get(&to).ok_or(Error::NotLinked(to))?;
        let packet_type = packet.packet_type();
        let admission = link.enqueue(packet, &self.metrics);
        if admission.is_queued() {
            match packet_type {
                PacketType::Interest => self.metrics.interests_forwarded.increment(),
                PacketType::Data => self.metrics.data_forwarded.increment(),
            }
        }
        Ok(admission)
    }

    /// Data packets under `prefix` still waiting in the queue toward `face`.
    pub fn in_flight(&self, face: SocketAddr, prefix: &Name) -> usize {
        self.links.get(&face).map_or(0, |link| {
            link.count_queued(&|packet| {
                packet
                    .as_data()
                    .is_some_and(|data| prefix.is_prefix_of(&data.name))
            })
        })
    }

    /// Wait for the next well-formed packet from a linked peer.
    ///
    /// Datagrams from unknown senders and datagrams that fail to decode
    /// are counted and skipped.
    pub async fn recv(&self) -> Result<(SocketAddr, Packet)> {
        loop {
            let (from, bytes) = self.transport.recv().await?;
            if !self.is_linked_to(from) {
                self.metrics.packets_rejected.increment();
                debug!("[Node {}] Ignoring datagram from unlinked {}", self.name, from);
                continue;
            }

            match wire::decode(&bytes) {
                Ok(packet) => {
                    match packet.packet_type() {
                        PacketType::Interest => self.metrics.interests_received.increment(),
                        PacketType::Data => self.metrics.data_received.increment(),
                    }
                    return Ok((from, packet));
                }
                Err(e) => {
                    self.metrics.packets_rejected.increment();
                    warn!("[Node {}] Dropping malformed packet from {}: {}", self.name, from, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::FifoQueue;
    use bytes::Bytes;
    use rust_ccn_common::{Data, Interest, InterestKind};
    use rust_ccn_transport::MemoryNetwork;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn linked_pair(network: &MemoryNetwork) -> (Node, Node) {
        let mut a = Node::new("a", Arc::new(network.bind(addr(1))));
        let mut b = Node::new("b", Arc::new(network.bind(addr(2))));
        a.add_link(LinkConfig::new("a-b", addr(2), 0), Box::new(FifoQueue::default()));
        b.add_link(LinkConfig::new("b-a", addr(1), 0), Box::new(FifoQueue::default()));
        (a, b)
    }

    #[tokio::test]
    async fn test_send_and_recv() {
        let network = MemoryNetwork::new();
        let (a, b) = linked_pair(&network);

        let interest = Packet::interest(Interest::new(Name::from_string("/x"), InterestKind::Subscribe(4)));
        assert!(a.send(addr(2), interest.clone()).unwrap().is_queued());

        let (from, packet) = b.recv().await.unwrap();
        assert_eq!(from, addr(1));
        assert_eq!(packet, interest);
        assert_eq!(a.metrics().interests_forwarded.value(), 1);
        assert_eq!(b.metrics().interests_received.value(), 1);
    }

    #[tokio::test]
    async fn test_send_to_unlinked_peer() {
        let network = MemoryNetwork::new();
        let (a, _b) = linked_pair(&network);
        let packet = Packet::data(Data::new(Name::from_string("/x/1"), 4));
        assert!(matches!(a.send(addr(9), packet), Err(Error::NotLinked(_))));
    }

    #[tokio::test]
    async fn test_recv_skips_strangers_and_garbage() {
        let network = MemoryNetwork::new();
        let (a, b) = linked_pair(&network);
        let stranger = network.bind(addr(3));

        let data = Packet::data(Data::new(Name::from_string("/x/1"), 4));
        stranger.send(addr(2), wire::encode(&data)).await.unwrap();
        a.transport.send(addr(2), Bytes::from_static(&[7, 0, 0])).await.unwrap();
        a.send(addr(2), data.clone()).unwrap();

        let (from, packet) = b.recv().await.unwrap();
        assert_eq!(from, addr(1));
        assert_eq!(packet, data);
        assert_eq!(b.metrics().packets_rejected.value(), 2);
    }
}
