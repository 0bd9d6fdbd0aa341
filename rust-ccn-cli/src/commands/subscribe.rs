//! `ccn subscribe`: pull a flow through a router

use crate::settings::NodeSettings;
use crate::utils::{print_header, Timer};
use anyhow::{Context, Result};
use log::info;
use rust_ccn_common::Name;
use rust_ccn_endhost::{end_host_node, Subscriber};
use std::net::SocketAddr;

#[allow(clippy::too_many_arguments)]
pub async fn run_subscriber(
    name: String,
    bind_addr: SocketAddr,
    router: SocketAddr,
    flow: String,
    bandwidth_kbps: u64,
    delay_ms: u64,
    limit: Option<u64>,
    settings: NodeSettings,
) -> Result<()> {
    let transport = super::bind(bind_addr).await?;
    let link = settings.link("first-hop", router, bandwidth_kbps, delay_ms)?;
    let node = end_host_node(name.clone(), transport, link);

    let mut subscriber = Subscriber::new(node, router, Name::from_string(&flow));
    if let Some(limit) = limit {
        subscriber = subscriber.with_limit(limit);
    }

    let timer = Timer::new(&format!("subscriber {}", name));
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
        report = subscriber.run() => {
            let report = report.context("Subscriber stopped")?;
            print_header(&format!("Subscriber {}", name));
            println!("Received: {}  Marked: {}", report.received, report.marked);
            println!("Final window: {}", report.window);
        }
    }
    drop(timer);
    Ok(())
}
