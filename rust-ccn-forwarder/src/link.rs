//! Emulated point-to-point links.
//!
//! Every link owns a packet queue and a drain task. The task takes one
//! packet at a time, holds it for the serialization time the emulated
//! bandwidth implies, then hands it to the transport after the configured
//! propagation delay. Propagation runs on a detached timer so that the
//! next packet can start serializing while earlier ones are in flight.

use crate::queue::{Admission, PacketQueue};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use rust_ccn_common::{metrics::NodeMetrics, wire, Packet};
use rust_ccn_transport::Transport;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Bandwidth of the underlying interface the emulation runs on.
pub const PHYSICAL_BANDWIDTH_BPS: u64 = 1_000_000_000;

/// Per-packet framing bytes added to the encoded size when timing a send.
pub const DEFAULT_OVERHEAD_BYTES: usize = 36;

/// Static properties of one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Human-readable link name, used in logs and diagnostics file names.
    pub name: String,

    /// Address of the node at the far end.
    pub peer: SocketAddr,

    /// Emulated bandwidth in bits per second.
    pub bandwidth_bps: u64,

    /// One-way propagation delay.
    pub delay: Duration,

    /// Bandwidth already spent by the real interface, subtracted from the emulated delay.
    pub physical_bandwidth_bps: u64,

    /// Framing bytes counted on top of each encoded packet.
    pub overhead_bytes: usize,
}

impl LinkConfig {
    pub fn new(name: impl Into<String>, peer: SocketAddr, bandwidth_bps: u64) -> Self {
        Self {
            name: name.into(),
            peer,
            bandwidth_bps,
            delay: Duration::ZERO,
            physical_bandwidth_bps: PHYSICAL_BANDWIDTH_BPS,
            overhead_bytes: DEFAULT_OVERHEAD_BYTES,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Time a packet of `packet_len` encoded bytes occupies the link.
    ///
    /// A zero bandwidth means the link is not rate limited.
    pub fn serialization_delay(&self, packet_len: usize) -> Duration {
        if self.bandwidth_bps == 0 {
            return Duration::ZERO;
        }
        let bits = ((packet_len + self.overhead_bytes) * 8) as f64;
        let emulated = bits / self.bandwidth_bps as f64;
        let physical = if self.physical_bandwidth_bps == 0 {
            0.0
        } else {
            bits / self.physical_bandwidth_bps as f64
        };
        Duration::from_secs_f64((emulated - physical).max(0.0))
    }

    /// Full-size packets per second the link drains, used to age the AQM average.
    pub fn idle_drain_rate(&self) -> f64 {
        self.bandwidth_bps as f64 * 250.0 / 3.0 / 1e6
    }
}

struct LinkShared {
    queue: Mutex<Box<dyn PacketQueue>>,
    ready: Notify,
    /// Admitted packets not yet handed to the transport, queued or in transit.
    unsent: AtomicUsize,
}

/// A link and its running drain task.
pub struct Link {
    config: Arc<LinkConfig>,
    shared: Arc<LinkShared>,
    drain: JoinHandle<()>,
}

impl Link {
    /// Start draining `queue` toward `config.peer`. Must be called inside a Tokio runtime.
    pub fn spawn(
        config: LinkConfig,
        queue: Box<dyn PacketQueue>,
        transport: Arc<dyn Transport>,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        let config = Arc::new(config);
        let shared = Arc::new(LinkShared {
            queue: Mutex::new(queue),
            ready: Notify::new(),
            unsent: AtomicUsize::new(0),
        });
        let drain = tokio::spawn(drain(config.clone(), shared.clone(), transport, metrics));

        debug!(
            "[Link {}] Up toward {} at {} bps, delay {:?}",
            config.name, config.peer, config.bandwidth_bps, config.delay
        );
        Self {
            config,
            shared,
            drain,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Offer a packet to the link queue.
    pub fn enqueue(&self, packet: Packet, metrics: &NodeMetrics) -> Admission {
        let mut queue = self.shared.queue.lock();
        let admission = queue.enqueue(packet, Instant::now());
        if admission.is_queued() {
            // Counted under the lock so the drain task cannot see the packet first.
            metrics.queued_packets.increment();
            self.shared.unsent.fetch_add(1, Ordering::SeqCst);
        }
        drop(queue);

        match admission {
            Admission::Queued { marked } => {
                if marked {
                    metrics.packets_marked.increment();
                }
                self.shared.ready.notify_one();
            }
            Admission::Dropped => {
                metrics.packets_dropped.increment();
                debug!("[Link {}] Queue full, packet dropped", self.config.name);
            }
        }
        admission
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Packets accepted by the link that the transport has not sent yet.
    ///
    /// Unlike [`Link::queue_len`] this includes the packet being serialized
    /// and packets still waiting out the propagation delay.
    pub fn unsent(&self) -> usize {
        self.shared.unsent.load(Ordering::SeqCst)
    }

    /// Count queued packets accepted by `predicate`.
    pub fn count_queued(&self, predicate: &dyn Fn(&Packet) -> bool) -> usize {
        self.shared.queue.lock().count_matching(predicate)
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.drain.abort();
    }
}

async fn drain(
    config: Arc<LinkConfig>,
    shared: Arc<LinkShared>,
    transport: Arc<dyn Transport>,
    metrics: Arc<NodeMetrics>,
) {
    loop {
        let next = {
            let mut queue = shared.queue.lock();
            let next = queue.dequeue(Instant::now());
            if next.is_some() {
                metrics.queued_packets.decrement();
            }
            next
        };
        let Some(packet) = next else {
            shared.ready.notified().await;
            continue;
        };

        let bytes = wire::encode(&packet);
        let hold = config.serialization_delay(bytes.len());
        if !hold.is_zero() {
            tokio::time::sleep(hold).await;
        }
        metrics.bytes_sent.add(bytes.len() as u64);
        trace!("[Link {}] Sending {} ({} bytes)", config.name, packet, bytes.len());

        let peer = config.peer;
        if config.delay.is_zero() {
            if let Err(e) = transport.send(peer, bytes).await {
                warn!("[Link {}] Send to {} failed: {}", config.name, peer, e);
            }
            shared.unsent.fetch_sub(1, Ordering::SeqCst);
        } else {
            let transport = transport.clone();
            let shared = shared.clone();
            let delay = config.delay;
            let name = config.name.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = transport.send(peer, bytes).await {
                    warn!("[Link {}] Send to {} failed: {}", name, peer, e);
                }
                shared.unsent.fetch_sub(1, Ordering::SeqCst);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::FifoQueue;
    use rust_ccn_common::{Data, Name};
    use rust_ccn_transport::MemoryNetwork;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_serialization_delay() {
        let link = LinkConfig::new("a-b", addr(1), 1_000_000);
        // (1464 + 36) bytes at 1 Mbps less the same at 1 Gbps.
        let expected = 12_000.0 / 1e6 - 12_000.0 / 1e9;
        let delay = link.serialization_delay(1464).as_secs_f64();
        assert!((delay - expected).abs() < 1e-9);

        let unlimited = LinkConfig::new("a-b", addr(1), 0);
        assert_eq!(unlimited.serialization_delay(1464), Duration::ZERO);
    }

    #[test]
    fn test_idle_drain_rate() {
        let link = LinkConfig::new("a-b", addr(1), 12_000_000);
        assert!((link.idle_drain_rate() - 1000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_link_delivers_in_order() {
        let network = MemoryNetwork::new();
        let sender = Arc::new(network.bind(addr(1)));
        let receiver = network.bind(addr(2));
        let metrics = Arc::new(NodeMetrics::new());

        let link = Link::spawn(
            LinkConfig::new("1-2", addr(2), 100_000_000),
            Box::new(FifoQueue::default()),
            sender,
            metrics.clone(),
        );
        for i in 0..3 {
            let packet = Packet::data(Data::new(Name::from_string("/f").child([i.to_string()]), 8));
            assert!(link.enqueue(packet, &metrics).is_queued());
        }

        for i in 0..3 {
            let (from, bytes) = receiver.recv().await.unwrap();
            assert_eq!(from, addr(1));
            let packet = wire::decode(&bytes).unwrap();
            assert_eq!(packet.name().to_string(), format!("/f/{i}"));
        }
        assert_eq!(link.queue_len(), 0);
        assert_eq!(metrics.queued_packets.value(), 0);
        assert!(metrics.bytes_sent.value() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_applies_propagation_delay() {
        let network = MemoryNetwork::new();
        let sender = Arc::new(network.bind(addr(1)));
        let receiver = network.bind(addr(2));
        let metrics = Arc::new(NodeMetrics::new());

        let link = Link::spawn(
            LinkConfig::new("1-2", addr(2), 0).with_delay(Duration::from_millis(50)),
            Box::new(FifoQueue::default()),
            sender,
            metrics.clone(),
        );
        let start = tokio::time::Instant::now();
        link.enqueue(Packet::data(Data::new(Name::from_string("/f/0"), 8)), &metrics);
        receiver.recv().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsent_covers_serialization_and_propagation() {
        let network = MemoryNetwork::new();
        let sender = Arc::new(network.bind(addr(1)));
        let receiver = network.bind(addr(2));
        let metrics = Arc::new(NodeMetrics::new());

        let link = Link::spawn(
            LinkConfig::new("1-2", addr(2), 1_000_000).with_delay(Duration::from_millis(20)),
            Box::new(FifoQueue::default()),
            sender,
            metrics.clone(),
        );
        for i in 0..3 {
            let packet = Packet::data(Data::new(Name::from_string("/f").child([i.to_string()]), 1400));
            link.enqueue(packet, &metrics);
        }
        assert_eq!(link.unsent(), 3);

        while link.queue_len() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(link.unsent() > 0);

        while link.unsent() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        for _ in 0..3 {
            receiver.recv().await.unwrap();
        }
        assert_eq!(metrics.queued_packets.value(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_queued_gauge_never_underflows() {
        let network = MemoryNetwork::new();
        let sender = Arc::new(network.bind(addr(1)));
        let _receiver = network.bind(addr(2));
        let metrics = Arc::new(NodeMetrics::new());

        let link = Link::spawn(
            LinkConfig::new("1-2", addr(2), 0),
            Box::new(FifoQueue::new(usize::MAX)),
            sender,
            metrics.clone(),
        );
        for i in 0..2_000 {
            let packet = Packet::data(Data::new(Name::from_string("/f").child([i.to_string()]), 8));
            link.enqueue(packet, &metrics);
            assert!(metrics.queued_packets.value() <= 2_000);
        }
    }
}
