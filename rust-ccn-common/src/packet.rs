//! Packet types and structures.
//!
//! Every packet is an envelope carrying a sticky congestion mark and a
//! rate signal around either an Interest or a Data payload. The envelope
//! fields can only change through [`Packet::apply`], which is how a hop
//! records its effect on a packet in transit.

use crate::name::Name;
use crate::wire;
use std::fmt;

/// Largest count a single subscription Interest can carry.
pub const MAX_SUBSCRIPTION: u8 = 253;

/// Initial rate signal of a fresh packet; hops only ever lower it.
pub const RATE_SIGNAL_UNLIMITED: u16 = u16::MAX;

/// Packet type discriminator as it appears in the first wire byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Interest = 1,
    Data = 2,
}

impl PacketType {
    /// Parses the low seven bits of the first wire byte.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            1 => Some(PacketType::Interest),
            2 => Some(PacketType::Data),
            _ => None,
        }
    }
}

/// What an Interest asks of the forwarders it crosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterestKind {
    /// Acknowledgement class, routed along the FIB without PIT state.
    Ack,
    /// Subscribe to this many more Data packets, `1..=253`.
    Subscribe(u8),
    /// Subscribe to every Data packet under the name.
    Infinite,
    /// Plain forwarding request; carries no PIT state.
    Request,
}

impl InterestKind {
    const ACK: u8 = 0;
    const INFINITE: u8 = 254;
    const REQUEST: u8 = 255;

    /// Decodes the Interest type byte.
    pub fn from_byte(value: u8) -> Self {
        match value {
            Self::ACK => InterestKind::Ack,
            Self::INFINITE => InterestKind::Infinite,
            Self::REQUEST => InterestKind::Request,
            count => InterestKind::Subscribe(count),
        }
    }

    /// A subscription for `count` packets, if one Interest can carry it.
    pub fn subscribe(count: u32) -> Option<Self> {
        u8::try_from(count)
            .ok()
            .filter(|count| (1..=MAX_SUBSCRIPTION).contains(count))
            .map(InterestKind::Subscribe)
    }

    /// Encodes the Interest type byte.
    ///
    /// # Panics
    ///
    /// Panics on a `Subscribe` count outside `1..=253`, which would encode
    /// as a different request class.
    pub fn to_byte(self) -> u8 {
        match self {
            InterestKind::Ack => Self::ACK,
            InterestKind::Subscribe(count) => {
                assert!(
                    (1..=MAX_SUBSCRIPTION).contains(&count),
                    "subscription count {count} out of range"
                );
                count
            }
            InterestKind::Infinite => Self::INFINITE,
            InterestKind::Request => Self::REQUEST,
        }
    }
}

/// Represents an Interest packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    /// The name requested in the Interest.
    pub name: Name,

    /// The request class and count.
    pub kind: InterestKind,
}

impl Interest {
    /// Creates a new Interest.
    pub fn new(name: Name, kind: InterestKind) -> Self {
        Self { name, kind }
    }

    /// Builds the subscription Interests that together request `total` packets.
    ///
    /// Counts above [`MAX_SUBSCRIPTION`] are split across several Interests.
    pub fn subscriptions(name: &Name, total: u32) -> Vec<Interest> {
        let mut remaining = total;
        let mut interests = Vec::new();
        while remaining > 0 {
            let count = remaining.min(MAX_SUBSCRIPTION as u32) as u8;
            interests.push(Interest::new(name.clone(), InterestKind::Subscribe(count)));
            remaining -= count as u32;
        }
        interests
    }
}

/// Represents a Data packet.
///
/// The content is an opaque fill of `content_len` bytes; only its size
/// matters to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    /// The name of the Data packet.
    pub name: Name,

    /// Length of the content fill in bytes.
    pub content_len: u32,
}

impl Data {
    /// Creates a new Data packet.
    pub fn new(name: Name, content_len: u32) -> Self {
        Self { name, content_len }
    }

    /// Creates a Data packet whose encoding is `wire_size` bytes long.
    ///
    /// If the name alone exceeds `wire_size`, the content is empty.
    pub fn with_wire_size(name: Name, wire_size: usize) -> Self {
        let overhead = wire::data_overhead(&name);
        let content_len = wire_size.saturating_sub(overhead) as u32;
        Self { name, content_len }
    }
}

/// The packet body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Interest(Interest),
    Data(Data),
}

/// Effect a hop applies to a packet in transit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HopEffect {
    /// Set the congestion mark.
    pub mark: bool,
    /// Lower the rate signal to at most this value.
    pub rate_limit: Option<u16>,
}

impl HopEffect {
    /// An effect that only sets the congestion mark.
    pub fn mark() -> Self {
        Self {
            mark: true,
            rate_limit: None,
        }
    }

    /// An effect that only caps the rate signal.
    pub fn rate_limit(limit: u16) -> Self {
        Self {
            mark: false,
            rate_limit: Some(limit),
        }
    }
}

/// A packet on the wire: envelope plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    marked: bool,
    rate_signal: u16,
    payload: Payload,
}

impl Packet {
    /// Wraps an Interest in a fresh, unmarked envelope.
    pub fn interest(interest: Interest) -> Self {
        Self::from_payload(Payload::Interest(interest))
    }

    /// Wraps a Data packet in a fresh, unmarked envelope.
    pub fn data(data: Data) -> Self {
        Self::from_payload(Payload::Data(data))
    }

    fn from_payload(payload: Payload) -> Self {
        Self {
            marked: false,
            rate_signal: RATE_SIGNAL_UNLIMITED,
            payload,
        }
    }

    /// Rebuilds a packet with the envelope fields read off the wire.
    pub(crate) fn from_parts(marked: bool, rate_signal: u16, payload: Payload) -> Self {
        Self {
            marked,
            rate_signal,
            payload,
        }
    }

    /// Applies a hop's effect. The mark is sticky and the rate signal only decreases.
    pub fn apply(&mut self, effect: HopEffect) {
        self.marked |= effect.mark;
        if let Some(limit) = effect.rate_limit {
            self.rate_signal = self.rate_signal.min(limit);
        }
    }

    /// Whether some hop marked this packet as having crossed a congested queue.
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Minimum forwarding rate observed along the path so far.
    pub fn rate_signal(&self) -> u16 {
        self.rate_signal
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn packet_type(&self) -> PacketType {
        match self.payload {
            Payload::Interest(_) => PacketType::Interest,
            Payload::Data(_) => PacketType::Data,
        }
    }

    /// Get the name of the packet
    pub fn name(&self) -> &Name {
        match &self.payload {
            Payload::Interest(interest) => &interest.name,
            Payload::Data(data) => &data.name,
        }
    }

    /// Returns the Data payload, if any.
    pub fn as_data(&self) -> Option<&Data> {
        match &self.payload {
            Payload::Data(data) => Some(data),
            Payload::Interest(_) => None,
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.marked { "M" } else { "" };
        match &self.payload {
            Payload::Interest(interest) => write!(
                f,
                "[Interest [{},{}] {:?} {}]",
                mark, self.rate_signal, interest.kind, interest.name
            ),
            Payload::Data(data) => write!(
                f,
                "[Data [{},{}] {} len={}]",
                mark, self.rate_signal, data.name, data.content_len
            ),
        }
    }
}
