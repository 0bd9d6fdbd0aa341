//! The forwarding engine.
//!
//! Subscription Interests leave per-face counts in the PIT and are
//! propagated upstream along the FIB only when they raise the entry's
//! maximum. Data packets consume one unit of demand from every PIT entry
//! whose name is a prefix of the Data name and travel back to every face
//! that was waiting, carrying a rate signal no larger than what that face
//! still has outstanding. Acknowledgement Interests follow the FIB and
//! leave no state.

use crate::fib::FibEntry;
use crate::node::Node;
use crate::pit::{MaxChange, PendingCount, PitEntry};
use crate::queue::Admission;
use log::{debug, error, info, trace};
use parking_lot::Mutex;
use rust_ccn_common::{
    Error, HopEffect, Interest, InterestKind, Name, Packet, Payload, PrefixTrie, Result,
};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;

/// One outbound packet decided by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forward {
    pub to: SocketAddr,
    pub packet: Packet,
}

/// One face of a PIT entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaceRecord {
    pub face: SocketAddr,
    pub count: PendingCount,
}

/// A PIT entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PitRecord {
    pub name: Name,
    pub max: PendingCount,
    pub faces: Vec<FaceRecord>,
}

/// A FIB route in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FibRecord {
    pub prefix: Name,
    pub next_hop: SocketAddr,
    pub hops: u32,
}

/// FIB, PIT and the node they forward through.
pub struct ForwardingEngine {
    node: Node,
    fib: Mutex<PrefixTrie<FibEntry>>,
    pit: Mutex<PrefixTrie<PitEntry>>,
}

impl ForwardingEngine {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            fib: Mutex::new(PrefixTrie::new()),
            pit: Mutex::new(PrefixTrie::new()),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Add a route, or update its hop count if the same prefix already routes to `next_hop`.
    ///
    /// The next hop must be a linked neighbour.
    pub fn add_route(&self, prefix: &Name, next_hop: SocketAddr, hops: u32) -> Result<()> {
        if !self.node.is_linked_to(next_hop) {
            error!(
                "[Engine {}] Route {} via {} names an unlinked next hop",
                self.node.name(),
                prefix,
                next_hop
            );
            return Err(Error::NotLinked(next_hop));
        }

        let mut fib = self.fib.lock();
        if let Some(entries) = fib.get_mut(prefix) {
            if let Some(entry) = entries.iter_mut().find(|entry| entry.next_hop == next_hop) {
                entry.hops = hops;
                return Ok(());
            }
        }
        fib.add(prefix, FibEntry::new(next_hop, hops));
        debug!("[Engine {}] Route {} via {} ({} hops)", self.node.name(), prefix, next_hop, hops);
        Ok(())
    }

    /// Decide what a packet received from `from` turns into.
    pub fn process(&self, from: SocketAddr, packet: Packet) -> Vec<Forward> {
        trace!("[Engine {}] {} from {}", self.node.name(), packet, from);
        let interest = match packet.payload() {
            Payload::Interest(interest) => interest,
            Payload::Data(_) => return self.on_data(packet),
        };

        let kind = interest.kind;
        match kind {
            InterestKind::Ack => self.on_ack(packet),
            InterestKind::Subscribe(count) => {
                self.on_subscription(from, &interest.name, PendingCount::Finite(count as u32))
            }
            InterestKind::Infinite => self.on_subscription(from, &interest.name, PendingCount::Infinite),
            InterestKind::Request => {
                debug!(
                    "[Engine {}] Ignoring plain request for {}",
                    self.node.name(),
                    interest.name
                );
                Vec::new()
            }
        }
    }

    /// Process a packet and queue the result on the node's links.
    pub fn handle(&self, from: SocketAddr, packet: Packet) -> Result<()> {
        for forward in self.process(from, packet) {
            if self.node.send(forward.to, forward.packet)? == Admission::Dropped {
                debug!("[Engine {}] Queue toward {} dropped a packet", self.node.name(), forward.to);
            }
        }
        Ok(())
    }

    /// Receive and handle packets until the transport fails.
    pub async fn run(&self) -> Result<()> {
        info!("[Engine {}] Forwarding on {}", self.node.name(), self.node.local_addr());
        loop {
            let (from, packet) = self.node.recv().await?;
            if let Err(e) = self.handle(from, packet) {
                error!("[Engine {}] Failed to forward: {}", self.node.name(), e);
            }
        }
    }

    fn next_hops(&self, name: &Name) -> Vec<SocketAddr> {
        let mut hops = Vec::new();
        self.fib.lock().for_each_longest_prefix_match_value(name, |entry| {
            if !hops.contains(&entry.next_hop) {
                hops.push(entry.next_hop);
            }
        });
        hops
    }

    fn on_ack(&self, packet: Packet) -> Vec<Forward> {
        self.next_hops(packet.name())
            .into_iter()
            .map(|to| Forward {
                to,
                packet: packet.clone(),
            })
            .collect()
    }

    fn on_subscription(&self, from: SocketAddr, name: &Name, request: PendingCount) -> Vec<Forward> {
        let change = {
            let mut pit = self.pit.lock();
            let entry = pit.lookup_or_create(name, PitEntry::new);
            let change = entry.update_face(from, request, || {
                u32::try_from(self.node.in_flight(from, name)).unwrap_or(u32::MAX)
            });
            if entry.is_empty() {
                pit.retain_exact(name, |entry| !entry.is_empty());
            }
            change
        };

        let upstream = match change {
            MaxChange::Increased(PendingCount::Infinite) => {
                vec![Interest::new(name.clone(), InterestKind::Infinite)]
            }
            MaxChange::Increased(PendingCount::Finite(delta)) => Interest::subscriptions(name, delta),
            MaxChange::Unchanged | MaxChange::Decreased => return Vec::new(),
        };

        let hops = self.next_hops(name);
        if hops.is_empty() {
            debug!("[Engine {}] No route for {}", self.node.name(), name);
        }
        hops.into_iter()
            .flat_map(|to| {
                upstream.iter().map(move |interest| Forward {
                    to,
                    packet: Packet::interest(interest.clone()),
                })
            })
            .collect()
    }

    fn on_data(&self, packet: Packet) -> Vec<Forward> {
        // A face waiting at several prefixes gets one copy, capped by its smallest remainder.
        let mut waiting: HashMap<SocketAddr, PendingCount> = HashMap::new();
        self.pit.lock().retain_satisfied(packet.name(), |_, entry| {
            for (face, remaining) in entry.satisfy() {
                waiting
                    .entry(face)
                    .and_modify(|current| *current = (*current).min(remaining))
                    .or_insert(remaining);
            }
            !entry.is_empty()
        });

        if waiting.is_empty() {
            debug!("[Engine {}] Unsolicited Data {}", self.node.name(), packet.name());
        }
        waiting
            .into_iter()
            .map(|(to, remaining)| {
                let mut packet = packet.clone();
                if let Some(limit) = remaining.rate_limit() {
                    packet.apply(HopEffect::rate_limit(limit));
                }
                Forward { to, packet }
            })
            .collect()
    }

    /// Current PIT contents, sorted by name.
    pub fn pit_snapshot(&self) -> Vec<PitRecord> {
        let mut records = Vec::new();
        self.pit.lock().for_each_pair(|name, entry| {
            let mut faces: Vec<FaceRecord> = entry
                .faces()
                .map(|(face, count)| FaceRecord { face, count })
                .collect();
            faces.sort_by_key(|record| record.face);
            records.push(PitRecord {
                name: name.clone(),
                max: entry.max(),
                faces,
            });
        });
        records.sort_by_key(|record| record.name.to_string());
        records
    }

    /// Current FIB routes, sorted by prefix.
    pub fn fib_snapshot(&self) -> Vec<FibRecord> {
        let mut records = Vec::new();
        self.fib.lock().for_each_pair(|prefix, entry| {
            records.push(FibRecord {
                prefix: prefix.clone(),
                next_hop: entry.next_hop,
                hops: entry.hops,
            });
        });
        records.sort_by_key(|record| (record.prefix.to_string(), record.next_hop));
        records
    }
}
