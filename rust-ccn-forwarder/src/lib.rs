//! Forwarding plane for a subscription-based CCN node.
//!
//! A [`Node`] owns the outbound links of one endpoint: each link has a
//! bounded packet queue (plain FIFO or AQM) drained by its own task at the
//! link's configured bandwidth. The [`ForwardingEngine`] sits on top of a
//! node and keeps the FIB and PIT, turning every received packet into a
//! set of outbound packets.

pub mod aqm;
pub mod diagnostics;
pub mod engine;
pub mod fib;
pub mod link;
pub mod node;
pub mod pit;
pub mod queue;

pub use aqm::{Aqm, AqmConfig, AqmDecision, AqmQueue};
pub use diagnostics::{QueueEvent, QueueObserver, WriteBehindLog};
pub use engine::{FaceRecord, FibRecord, Forward, ForwardingEngine, PitRecord};
pub use fib::FibEntry;
pub use link::{Link, LinkConfig, DEFAULT_OVERHEAD_BYTES, PHYSICAL_BANDWIDTH_BPS};
pub use node::Node;
pub use pit::{MaxChange, PendingCount, PitEntry};
pub use queue::{Admission, FifoQueue, PacketQueue};
