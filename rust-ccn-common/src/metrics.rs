//! Metrics collection for CCN nodes.
//!
//! Counters are plain relaxed atomics; they are read for logging and
//! snapshots, never used for synchronisation.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/* ---------------------------------------------------------------- *
 * Simple Counter
 * ---------------------------------------------------------------- */

#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/* ---------------------------------------------------------------- *
 * Gauge
 * ---------------------------------------------------------------- */

#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/* ---------------------------------------------------------------- *
 * Aggregate metrics for a node
 * ---------------------------------------------------------------- */

#[derive(Debug, Default)]
pub struct NodeMetrics {
    pub interests_received: Counter,
    pub interests_forwarded: Counter,
    pub data_received: Counter,
    pub data_forwarded: Counter,
    /// Packets marked by an AQM queue on admission
    pub packets_marked: Counter,
    /// Packets dropped by a full queue
    pub packets_dropped: Counter,
    /// Packets rejected at decode or arriving from unlinked peers
    pub packets_rejected: Counter,
    pub bytes_sent: Counter,
    /// Packets currently queued across all links
    pub queued_packets: Gauge,
}

/// Point-in-time copy of [`NodeMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub interests_received: u64,
    pub interests_forwarded: u64,
    pub data_received: u64,
    pub data_forwarded: u64,
    pub packets_marked: u64,
    pub packets_dropped: u64,
    pub packets_rejected: u64,
    pub bytes_sent: u64,
}

impl NodeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            interests_received: self.interests_received.value(),
            interests_forwarded: self.interests_forwarded.value(),
            data_received: self.data_received.value(),
            data_forwarded: self.data_forwarded.value(),
            packets_marked: self.packets_marked.value(),
            packets_dropped: self.packets_dropped.value(),
            packets_rejected: self.packets_rejected.value(),
            bytes_sent: self.bytes_sent.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_and_snapshot() {
        let metrics = NodeMetrics::new();
        metrics.data_forwarded.increment();
        metrics.data_forwarded.increment();
        metrics.bytes_sent.add(1500);
        metrics.queued_packets.set(4);
        metrics.queued_packets.increment();
        metrics.queued_packets.decrement();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.data_forwarded, 2);
        assert_eq!(snapshot.bytes_sent, 1500);
        assert_eq!(snapshot.packets_marked, 0);
        assert_eq!(metrics.queued_packets.value(), 4);
    }
}
