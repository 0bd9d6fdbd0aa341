//! Error types for the CCN node.

use std::net::SocketAddr;
use thiserror::Error;

/// All possible errors that can occur within the node.
#[derive(Error, Debug)]
pub enum Error {
    /// The buffer ended before a field could be read.
    #[error("packet truncated: needed {needed} bytes but only {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// The low seven bits of the first byte name no known packet type.
    #[error("unknown packet type {0:#04x}")]
    UnknownPacketType(u8),

    /// Framing was readable but inconsistent.
    #[error("malformed packet: {0}")]
    Malformed(String),

    /// A name component was not valid UTF-8.
    #[error("invalid name component: {0}")]
    InvalidComponent(#[from] std::string::FromUtf8Error),

    /// A packet or route referenced a peer with no established link.
    #[error("no link to peer {0}")]
    NotLinked(SocketAddr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Whether this error came from decoding untrusted input.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::Truncated { .. }
                | Error::UnknownPacketType(_)
                | Error::Malformed(_)
                | Error::InvalidComponent(_)
        )
    }
}
