//! Subcommand implementations

pub mod publish;
pub mod router;
pub mod subscribe;

use anyhow::{Context, Result};
use rust_ccn_transport::UdpTransport;
use std::net::SocketAddr;
use std::sync::Arc;

/// Bind the UDP socket a node talks through.
async fn bind(addr: SocketAddr) -> Result<Arc<UdpTransport>> {
    let transport = UdpTransport::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    Ok(Arc::new(transport))
}
