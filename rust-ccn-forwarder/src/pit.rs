//! Pending Interest Table entries.
//!
//! An entry records, per downstream face, how many more Data packets the
//! face asked for under the entry's name. The entry's maximum over all
//! faces is what the node has asked for upstream, so a change in that
//! maximum is what gets propagated toward the producer.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

/// Outstanding demand of one face.
///
/// `Infinite` orders above every finite count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PendingCount {
    Finite(u32),
    Infinite,
}

impl PendingCount {
    pub fn is_zero(self) -> bool {
        self == PendingCount::Finite(0)
    }

    /// One Data packet was delivered. Infinite demand stays infinite.
    pub fn decrement(self) -> Self {
        match self {
            PendingCount::Finite(n) => PendingCount::Finite(n.saturating_sub(1)),
            PendingCount::Infinite => PendingCount::Infinite,
        }
    }

    /// The rate signal cap this count implies, saturated to the signal width.
    pub fn rate_limit(self) -> Option<u16> {
        match self {
            PendingCount::Finite(n) => Some(n.min(u16::MAX as u32) as u16),
            PendingCount::Infinite => None,
        }
    }
}

impl fmt::Display for PendingCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingCount::Finite(n) => write!(f, "{n}"),
            PendingCount::Infinite => write!(f, "inf"),
        }
    }
}

impl Serialize for PendingCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PendingCount::Finite(n) => serializer.serialize_u32(*n),
            PendingCount::Infinite => serializer.serialize_str("inf"),
        }
    }
}

/// How an update moved the entry's maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxChange {
    Unchanged,
    /// The maximum grew. Carries the finite increase, or `Infinite` if it became infinite.
    Increased(PendingCount),
    Decreased,
}

/// Per-name PIT record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PitEntry {
    faces: HashMap<SocketAddr, PendingCount>,
    max: Option<PendingCount>,
}

impl PitEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest count over all faces, zero when no face is waiting.
    pub fn max(&self) -> PendingCount {
        self.max.unwrap_or(PendingCount::Finite(0))
    }

    pub fn count(&self, face: SocketAddr) -> Option<PendingCount> {
        self.faces.get(&face).copied()
    }

    pub fn faces(&self) -> impl Iterator<Item = (SocketAddr, PendingCount)> + '_ {
        self.faces.iter().map(|(face, count)| (*face, *count))
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Merge a new request from `face` and report how the maximum moved.
    ///
    /// Finite requests add to a finite count. A finite request replaces an
    /// infinite one, minus the Data already queued toward the face, which
    /// `in_flight` reports and which is only consulted in that case.
    pub fn update_face<F>(&mut self, face: SocketAddr, request: PendingCount, in_flight: F) -> MaxChange
    where
        F: FnOnce() -> u32,
    {
        let current = self.faces.get(&face).copied().unwrap_or(PendingCount::Finite(0));
        let updated = match (current, request) {
            (_, PendingCount::Infinite) => PendingCount::Infinite,
            (PendingCount::Infinite, PendingCount::Finite(c)) => {
                PendingCount::Finite(c.saturating_sub(in_flight()))
            }
            (PendingCount::Finite(n), PendingCount::Finite(c)) => PendingCount::Finite(n.saturating_add(c)),
        };
        if updated.is_zero() {
            self.faces.remove(&face);
        } else {
            self.faces.insert(face, updated);
        }

        let old = self.max();
        self.refresh_max();
        match (old, self.max()) {
            (PendingCount::Infinite, PendingCount::Infinite) => MaxChange::Unchanged,
            (_, PendingCount::Infinite) => MaxChange::Increased(PendingCount::Infinite),
            (PendingCount::Infinite, PendingCount::Finite(_)) => MaxChange::Decreased,
            (PendingCount::Finite(o), PendingCount::Finite(n)) if n > o => {
                MaxChange::Increased(PendingCount::Finite(n - o))
            }
            (PendingCount::Finite(o), PendingCount::Finite(n)) if n < o => MaxChange::Decreased,
            _ => MaxChange::Unchanged,
        }
    }

    /// Consume one Data packet for every waiting face.
    ///
    /// Returns each face that was waiting with its count after delivery.
    /// Faces left with nothing to wait for are removed.
    pub fn satisfy(&mut self) -> Vec<(SocketAddr, PendingCount)> {
        let mut delivered = Vec::with_capacity(self.faces.len());
        for (face, count) in self.faces.iter_mut() {
            *count = count.decrement();
            delivered.push((*face, *count));
        }
        self.faces.retain(|_, count| !count.is_zero());
        self.refresh_max();
        delivered
    }

    fn refresh_max(&mut self) {
        self.max = self.faces.values().copied().max();
    }
}
