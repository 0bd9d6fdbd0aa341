//! Random early marking for link queues.
//!
//! The AQM keeps an exponentially weighted average of the queue occupancy
//! and marks admitted packets with a probability that grows with that
//! average. Marking replaces dropping: a marked packet is still queued
//! and delivered, and the mark travels with it to the subscriber.
//!
//! Marking bands on the average occupancy `avg`:
//!
//! * `avg < min_th`: never mark.
//! * `min_th <= avg < max_th`: linear from 0 to `max_p`.
//! * `max_th <= avg < 2 * max_th`: linear from `max_p` to 1.
//! * `avg >= 2 * max_th`: always mark.
//!
//! `max_th` is fixed at three times `min_th`.

use crate::diagnostics::{QueueEvent, QueueObserver};
use crate::queue::{Admission, PacketQueue, DEFAULT_QUEUE_CAPACITY};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_ccn_common::{HopEffect, Packet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Default seed so that repeated runs mark the same packets.
pub const DEFAULT_AQM_SEED: u64 = 68413;

/// Tunables of the marking algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AqmConfig {
    /// Weight of the newest sample in the average.
    pub weight: f64,

    /// Average occupancy at which marking starts.
    pub min_threshold: f64,

    /// Marking probability reached at the upper threshold.
    pub max_probability: f64,

    /// Seed of the marking RNG.
    pub seed: u64,

    /// Queue capacity in packets.
    pub capacity: usize,
}

impl Default for AqmConfig {
    fn default() -> Self {
        Self {
            weight: 0.002,
            min_threshold: 5.0,
            max_probability: 0.1,
            seed: DEFAULT_AQM_SEED,
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl AqmConfig {
    pub fn max_threshold(&self) -> f64 {
        3.0 * self.min_threshold
    }
}

/// Result of one admission decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AqmDecision {
    /// Average occupancy after this admission.
    pub average: f64,
    /// Probability the admitted packet was marked with.
    pub probability: f64,
    /// Whether to mark the admitted packet.
    pub mark: bool,
}

/// Marking state of one queue.
#[derive(Debug)]
pub struct Aqm {
    weight: f64,
    min_th: f64,
    max_th: f64,
    max_p: f64,
    average: f64,
    /// Admissions since the last mark, -1 while below `min_th`.
    count: i64,
    idle_since: Option<Instant>,
    /// Packets the link could have sent per second while the queue sat empty.
    idle_drain_rate: f64,
    rng: StdRng,
}

impl Aqm {
    pub fn new(config: &AqmConfig, idle_drain_rate: f64) -> Self {
        Self {
            weight: config.weight,
            min_th: config.min_threshold,
            max_th: config.max_threshold(),
            max_p: config.max_probability,
            average: 0.0,
            count: -1,
            idle_since: None,
            idle_drain_rate,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    /// Decide on a packet just admitted; `occupancy` includes it.
    pub fn on_enqueue(&mut self, occupancy: usize, now: Instant) -> AqmDecision {
        self.update_average(occupancy, now);
        let avg = self.average;

        let (probability, mark) = if avg < self.min_th {
            self.count = -1;
            (0.0, false)
        } else if avg < 2.0 * self.max_th {
            self.count += 1;
            let pb = self.base_probability(avg);
            let spread = self.count as f64 * pb;
            let pa = if spread >= 1.0 { 1.0 } else { pb / (1.0 - spread) };
            let mark = self.rng.gen::<f64>() < pa;
            if mark {
                self.count = 0;
            }
            (pa, mark)
        } else {
            self.count = 0;
            (1.0, true)
        };

        AqmDecision {
            average: avg,
            probability,
            mark,
        }
    }

    /// Note a departure; `remaining` excludes the departed packet.
    pub fn on_dequeue(&mut self, remaining: usize, now: Instant) {
        if remaining == 0 {
            self.idle_since = Some(now);
        }
    }

    fn update_average(&mut self, occupancy: usize, now: Instant) {
        if occupancy == 1 {
            // The queue was empty: decay by the packets that could have left meanwhile.
            if let Some(idle_since) = self.idle_since {
                let idle = now.saturating_duration_since(idle_since).as_secs_f64();
                let m = self.idle_drain_rate * idle;
                self.average *= (1.0 - self.weight).powf(m);
            }
        } else {
            self.average = (1.0 - self.weight) * self.average + self.weight * occupancy as f64;
        }
    }

    fn base_probability(&self, avg: f64) -> f64 {
        if avg < self.max_th {
            self.max_p * (avg - self.min_th) / (self.max_th - self.min_th)
        } else {
            (1.0 - self.max_p) / self.max_th * avg + 2.0 * self.max_p - 1.0
        }
    }
}

/// Bounded FIFO that marks admitted packets through an [`Aqm`].
pub struct AqmQueue {
    packets: VecDeque<Packet>,
    capacity: usize,
    aqm: Aqm,
    observer: Option<Arc<dyn QueueObserver>>,
}

impl AqmQueue {
    pub fn new(config: &AqmConfig, idle_drain_rate: f64) -> Self {
        Self {
            packets: VecDeque::new(),
            capacity: config.capacity,
            aqm: Aqm::new(config, idle_drain_rate),
            observer: None,
        }
    }

    /// Report every admission and departure to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn QueueObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn aqm(&self) -> &Aqm {
        &self.aqm
    }
}

impl PacketQueue for AqmQueue {
    fn enqueue(&mut self, mut packet: Packet, now: Instant) -> Admission {
        if self.packets.len() >= self.capacity {
            return Admission::Dropped;
        }

        let decision = self.aqm.on_enqueue(self.packets.len() + 1, now);
        if decision.mark {
            packet.apply(HopEffect::mark());
        }
        self.packets.push_back(packet);

        if let Some(observer) = &self.observer {
            observer.record(QueueEvent::Enqueued {
                occupancy: self.packets.len(),
                average: decision.average,
                probability: decision.probability,
                marked: decision.mark,
            });
        }
        Admission::Queued {
            marked: decision.mark,
        }
    }

    fn dequeue(&mut self, now: Instant) -> Option<Packet> {
        let packet = self.packets.pop_front()?;
        self.aqm.on_dequeue(self.packets.len(), now);
        if let Some(observer) = &self.observer {
            observer.record(QueueEvent::Dequeued {
                occupancy: self.packets.len(),
            });
        }
        Some(packet)
    }

    fn len(&self) -> usize {
        self.packets.len()
    }

    fn count_matching(&self, predicate: &dyn Fn(&Packet) -> bool) -> usize {
        self.packets.iter().filter(|packet| predicate(packet)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rust_ccn_common::{Data, Name};
    use std::time::Duration;

    fn exact(min_threshold: f64) -> AqmConfig {
        AqmConfig {
            weight: 1.0,
            min_threshold,
            ..AqmConfig::default()
        }
    }

    fn data(i: usize) -> Packet {
        Packet::data(Data::new(Name::from_string("/flow").child([i.to_string()]), 100))
    }

    #[test]
    fn test_never_marks_below_min_threshold() {
        let now = Instant::now();
        let mut aqm = Aqm::new(&exact(5.0), 1.0);
        for occupancy in 1..5 {
            let decision = aqm.on_enqueue(occupancy, now);
            assert!(!decision.mark);
            assert_eq!(decision.probability, 0.0);
        }
    }

    #[test]
    fn test_always_marks_above_twice_max_threshold() {
        let now = Instant::now();
        let mut aqm = Aqm::new(&exact(5.0), 1.0);
        for occupancy in 30..40 {
            let decision = aqm.on_enqueue(occupancy, now);
            assert!(decision.mark);
            assert_eq!(decision.probability, 1.0);
        }
    }

    #[test]
    fn test_linear_band_probability() {
        let now = Instant::now();
        let mut aqm = Aqm::new(&exact(5.0), 1.0);
        aqm.on_enqueue(2, now);
        // avg 10 sits halfway between 5 and 15; the first sample in the band has count 0.
        let decision = aqm.on_enqueue(10, now);
        assert!((decision.probability - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_gentle_band_is_continuous() {
        let aqm = Aqm::new(&AqmConfig::default(), 1.0);
        let at_max = aqm.base_probability(15.0);
        assert!((at_max - 0.1).abs() < 1e-12);
        assert!((aqm.base_probability(30.0) - 1.0).abs() < 1e-12);
        assert!(aqm.base_probability(20.0) > at_max);
    }

    #[test]
    fn test_average_grows_with_occupancy() {
        let now = Instant::now();
        let mut aqm = Aqm::new(&AqmConfig::default(), 1.0);
        let mut last = aqm.average();
        for occupancy in 1..200 {
            aqm.on_enqueue(occupancy, now);
            assert!(aqm.average() >= last);
            last = aqm.average();
        }
        assert!(last > 0.0);
    }

    #[test]
    fn test_idle_decay() {
        let start = Instant::now();
        let config = AqmConfig {
            weight: 0.5,
            ..AqmConfig::default()
        };
        let mut aqm = Aqm::new(&config, 1.0);
        aqm.on_enqueue(1, start);
        aqm.on_enqueue(2, start);
        aqm.on_enqueue(3, start);
        assert!((aqm.average() - 2.0).abs() < 1e-12);

        aqm.on_dequeue(0, start);
        aqm.on_enqueue(1, start + Duration::from_secs(1));
        assert!((aqm.average() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_seeded_decisions_repeat() {
        let now = Instant::now();
        let config = AqmConfig {
            weight: 0.5,
            ..AqmConfig::default()
        };
        let run = || {
            let mut aqm = Aqm::new(&config, 1.0);
            (1..40)
                .map(|occupancy| aqm.on_enqueue(occupancy % 20 + 1, now).mark)
                .collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
        assert!(first.iter().any(|&mark| mark));
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<QueueEvent>>);

    impl QueueObserver for Recorder {
        fn record(&self, event: QueueEvent) {
            self.0.lock().push(event);
        }
    }

    #[test]
    fn test_queue_marks_admitted_packet() {
        let now = Instant::now();
        let recorder = Arc::new(Recorder::default());
        let mut queue = AqmQueue::new(&exact(1.0), 1.0).with_observer(recorder.clone());

        // With min_th 1 and exact averaging, occupancy 6 is at twice max_th.
        for i in 0..6 {
            queue.enqueue(data(i), now);
        }
        assert_eq!(queue.enqueue(data(6), now), Admission::Queued { marked: true });

        let mut marked = Vec::new();
        while let Some(packet) = queue.dequeue(now) {
            marked.push(packet.is_marked());
        }
        assert!(marked[6]);
        assert!(!marked[0]);

        let events = recorder.0.lock();
        assert_eq!(events.len(), 14);
        assert!(matches!(
            events.last(),
            Some(QueueEvent::Dequeued { occupancy: 0 })
        ));
    }

    #[test]
    fn test_queue_drops_when_full() {
        let now = Instant::now();
        let config = AqmConfig {
            capacity: 2,
            ..AqmConfig::default()
        };
        let mut queue = AqmQueue::new(&config, 1.0);
        assert!(queue.enqueue(data(0), now).is_queued());
        assert!(queue.enqueue(data(1), now).is_queued());
        assert_eq!(queue.enqueue(data(2), now), Admission::Dropped);
        assert_eq!(queue.len(), 2);
    }
}
