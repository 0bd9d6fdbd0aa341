//! End hosts of a CCN flow.
//!
//! A [`Subscriber`] pulls a flow through its first-hop router, sizing its
//! outstanding requests with a [`RateController`]. A [`Publisher`] pushes
//! a numbered sequence of Data packets toward its first hop. Both own a
//! [`Node`] with a single FIFO link.

use rust_ccn_forwarder::{FifoQueue, LinkConfig, Node};
use rust_ccn_transport::Transport;
use std::sync::Arc;

pub mod publisher;
pub mod rate;
pub mod subscriber;

pub use publisher::{Publisher, DEFAULT_DATA_WIRE_SIZE};
pub use rate::{ControlState, RateController};
pub use subscriber::{Subscriber, SubscriberReport};

/// Build an end-host node whose only link leads to its first hop.
pub fn end_host_node(name: impl Into<String>, transport: Arc<dyn Transport>, first_hop: LinkConfig) -> Node {
    let mut node = Node::new(name, transport);
    node.add_link(first_hop, Box::new(FifoQueue::new(usize::MAX)));
    node
}
