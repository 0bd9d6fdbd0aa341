//! `ccn router`: run a forwarding node until interrupted

use crate::settings::NodeSettings;
use crate::topology::{load_links, load_routes};
use crate::utils::{format_bytes, print_header, Timer};
use anyhow::{Context, Result};
use log::{info, warn};
use rust_ccn_forwarder::{AqmQueue, ForwardingEngine, Node, WriteBehindLog};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

pub async fn run_router(
    name: String,
    bind_addr: SocketAddr,
    links_path: &Path,
    routes_path: &Path,
    settings: NodeSettings,
) -> Result<()> {
    let links = load_links(links_path)?;
    let routes = load_routes(routes_path)?;

    let transport = super::bind(bind_addr).await?;
    let mut node = Node::new(name.clone(), transport);
    let mut logs = Vec::new();

    for spec in &links {
        let link = settings.link(&spec.name, spec.peer, spec.bandwidth_kbps, spec.delay_ms)?;
        let mut queue = AqmQueue::new(&settings.aqm, link.idle_drain_rate());
        if let Some(dir) = &settings.diagnostics_dir {
            let path = dir.join(format!("{}-{}.tsv", name, spec.name));
            let log = Arc::new(
                WriteBehindLog::create(&path)
                    .with_context(|| format!("Failed to create queue log {}", path.display()))?,
            );
            queue = queue.with_observer(log.clone());
            logs.push(log);
        }
        info!(
            "Link: {} {} BW:{}bps D:{}ms PTC:{:.0}",
            spec.name,
            spec.peer,
            link.bandwidth_bps,
            spec.delay_ms,
            link.idle_drain_rate()
        );
        node.add_link(link, Box::new(queue));
    }

    let engine = Arc::new(ForwardingEngine::new(node));
    for route in &routes {
        engine
            .add_route(&route.prefix, route.next_hop, route.hops)
            .with_context(|| format!("Cannot route {} via {}", route.prefix, route.next_hop))?;
        info!("FIB: {} -> {} ({} hops)", route.prefix, route.next_hop, route.hops);
    }

    let timer = Timer::new(&format!("router {}", name));
    let forwarding = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run().await })
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
        result = forwarding => {
            result
                .context("Forwarding task failed")?
                .context("Forwarding stopped")?;
        }
    }
    drop(timer);

    for log in &logs {
        if let Err(e) = log.close() {
            warn!("Failed to flush {}: {}", log.path().display(), e);
        }
    }

    let metrics = engine.node().metrics().snapshot();
    print_header(&format!("Router {}", name));
    println!(
        "Interests: {} in, {} out",
        metrics.interests_received, metrics.interests_forwarded
    );
    println!("Data: {} in, {} out", metrics.data_received, metrics.data_forwarded);
    println!(
        "Marked: {}  Dropped: {}  Rejected: {}",
        metrics.packets_marked, metrics.packets_dropped, metrics.packets_rejected
    );
    println!("Sent: {}", format_bytes(metrics.bytes_sent));

    print_header("Pending Interest Table");
    println!("{}", serde_json::to_string_pretty(&engine.pit_snapshot())?);
    Ok(())
}
