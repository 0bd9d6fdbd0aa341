//! Content-centric networking simulator.
//!
//! Subscribers ask for a number of Data packets under a name; routers
//! aggregate those requests in their PIT and forward only increases
//! upstream. Data flows back through AQM link queues that mark packets
//! under congestion, while every router lowers an in-band rate signal to
//! what the receiving face still has outstanding. The subscriber's rate
//! controller reacts to both.
//!
//! This crate re-exports the workspace members:
//!
//! * [`common`]: names, packets, the wire codec and the prefix trie
//! * [`transport`]: UDP and in-memory datagram transports
//! * [`forwarder`]: links, queues and the forwarding engine
//! * [`endhost`]: the subscriber, its rate controller and the publisher

pub use rust_ccn_common as common;
pub use rust_ccn_endhost as endhost;
pub use rust_ccn_forwarder as forwarder;
pub use rust_ccn_transport as transport;

pub use rust_ccn_common::{Error, Name, Packet, Result};
pub use rust_ccn_endhost::{Publisher, RateController, Subscriber};
pub use rust_ccn_forwarder::{ForwardingEngine, Node};
