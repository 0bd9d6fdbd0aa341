//! Common types and utilities for the content-centric networking node.
//!
//! This crate provides the pieces shared by forwarders and end hosts:
//! hierarchical names, the packet envelope and its wire format, the
//! prefix trie backing both FIB and PIT, and node metrics.

pub mod error;
pub mod metrics;
pub mod name;
pub mod packet;
pub mod trie;
pub mod wire;

/// Reexport of common types
pub use error::Error;
pub use name::Name;
pub use packet::{Data, HopEffect, Interest, InterestKind, Packet, PacketType, Payload};
pub use trie::PrefixTrie;

pub type Result<T> = std::result::Result<T, Error>;
