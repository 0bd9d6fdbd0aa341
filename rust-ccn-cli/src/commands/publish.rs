//! `ccn publish`: push a numbered flow toward a router

use crate::settings::NodeSettings;
use crate::utils::{format_bytes, Timer};
use anyhow::{Context, Result};
use log::info;
use rust_ccn_common::Name;
use rust_ccn_endhost::{end_host_node, Publisher};
use std::net::SocketAddr;

#[allow(clippy::too_many_arguments)]
pub async fn publish_flow(
    name: String,
    bind_addr: SocketAddr,
    router: SocketAddr,
    flow: String,
    count: u64,
    size: usize,
    bandwidth_kbps: u64,
    delay_ms: u64,
    settings: NodeSettings,
) -> Result<()> {
    let transport = super::bind(bind_addr).await?;
    let link = settings.link("first-hop", router, bandwidth_kbps, delay_ms)?;
    let node = end_host_node(name.clone(), transport, link);
    let publisher = Publisher::new(node, router, Name::from_string(&flow));

    let timer = Timer::new(&format!("publisher {}", name));
    let queued = publisher
        .publish(count, size)
        .context("Failed to queue the flow")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted before the flow drained"),
        _ = publisher.drained() => {
            println!(
                "Published {} packets of {} ({} on the wire)",
                queued,
                flow,
                format_bytes(publisher.node().metrics().bytes_sent.value())
            );
        }
    }
    drop(timer);
    Ok(())
}
