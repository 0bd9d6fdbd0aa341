//! Rate-controlled subscriber.

use crate::rate::RateController;
use log::{debug, info};
use rust_ccn_common::{Interest, Name, Packet, Result};
use rust_ccn_forwarder::Node;
use std::net::SocketAddr;

/// What a subscriber saw by the time it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriberReport {
    /// Data packets of the flow received
    pub received: u64,

    /// How many of them carried a congestion mark
    pub marked: u64,

    /// Window size when the subscriber stopped
    pub window: u32,
}

/// Pulls one flow through its first hop.
pub struct Subscriber {
    node: Node,
    first_hop: SocketAddr,
    flow: Name,
    controller: RateController,
    limit: Option<u64>,
}

impl Subscriber {
    pub fn new(node: Node, first_hop: SocketAddr, flow: Name) -> Self {
        Self {
            node,
            first_hop,
            flow,
            controller: RateController::new(),
            limit: None,
        }
    }

    /// Stop after receiving `packets` Data packets of the flow.
    pub fn with_limit(mut self, packets: u64) -> Self {
        self.limit = Some(packets);
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn controller(&self) -> &RateController {
        &self.controller
    }

    /// Request the flow and keep the window filled until the limit, if any, is reached.
    pub async fn run(&mut self) -> Result<SubscriberReport> {
        info!(
            "[Subscriber {}] Subscribing to {} via {}",
            self.node.name(),
            self.flow,
            self.first_hop
        );
        let initial = self.controller.start();
        self.request(initial)?;

        let mut report = SubscriberReport {
            window: self.controller.window(),
            ..SubscriberReport::default()
        };
        while self.limit.map_or(true, |limit| report.received < limit) {
            let (_, packet) = self.node.recv().await?;
            let Some(data) = packet.as_data() else {
                continue;
            };
            if !self.flow.is_prefix_of(&data.name) {
                debug!("[Subscriber {}] Ignoring Data {}", self.node.name(), data.name);
                continue;
            }

            let marked = packet.is_marked();
            report.received += 1;
            if marked {
                report.marked += 1;
            }

            let more = self.controller.on_data(packet.rate_signal(), marked);
            report.window = self.controller.window();
            info!(
                target: "rate",
                "{},{},{},{}",
                self.controller.window(),
                self.controller.state(),
                self.controller
                    .min_signal()
                    .map_or_else(|| "inf".to_string(), |signal| signal.to_string()),
                marked
            );
            if let Some(count) = more {
                self.request(count)?;
            }
        }
        Ok(report)
    }

    fn request(&self, count: u32) -> Result<()> {
        for interest in Interest::subscriptions(&self.flow, count) {
            self.node.send(self.first_hop, Packet::interest(interest))?;
        }
        Ok(())
    }
}
