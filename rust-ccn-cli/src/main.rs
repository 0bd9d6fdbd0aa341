use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;
use rust_ccn_endhost::DEFAULT_DATA_WIRE_SIZE;
use std::{net::SocketAddr, path::PathBuf};

mod commands;
mod settings;
mod topology;
mod utils;

use settings::NodeSettings;

/// CCN simulator: subscription routers and rate-controlled end hosts
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Sets the level of verbosity
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Node settings file (TOML); `CCN__*` environment variables override it
    #[clap(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Subcommand to execute
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a forwarding router
    Router {
        /// Router name, used in logs and queue log file names
        #[clap(short, long)]
        name: String,

        /// Local UDP address to bind
        #[clap(short, long)]
        bind: SocketAddr,

        /// Links file: `name ip port bandwidth_kbps delay_ms` per line
        #[clap(long, default_value = "links.txt")]
        links: PathBuf,

        /// Routes file: `prefix ip port [hops]` per line
        #[clap(long, default_value = "routes.txt")]
        routes: PathBuf,
    },

    /// Subscribe to a flow through a router
    Subscribe {
        /// Subscriber name
        #[clap(short, long, default_value = "subscriber")]
        name: String,

        /// Local UDP address to bind
        #[clap(short, long)]
        bind: SocketAddr,

        /// First-hop router address
        #[clap(short, long)]
        router: SocketAddr,

        /// Flow name prefix
        flow: String,

        /// Uplink bandwidth in kbit/s
        #[clap(long, default_value = "1000")]
        bandwidth_kbps: u64,

        /// Uplink propagation delay in milliseconds
        #[clap(long, default_value = "0")]
        delay_ms: u64,

        /// Stop after this many Data packets
        #[clap(short, long)]
        count: Option<u64>,
    },

    /// Publish a numbered flow toward a router
    Publish {
        /// Publisher name
        #[clap(short, long, default_value = "publisher")]
        name: String,

        /// Local UDP address to bind
        #[clap(short, long)]
        bind: SocketAddr,

        /// First-hop router address
        #[clap(short, long)]
        router: SocketAddr,

        /// Flow name prefix
        flow: String,

        /// Number of Data packets to publish
        #[clap(short, long, default_value = "100")]
        count: u64,

        /// Encoded size of each Data packet in bytes
        #[clap(long, default_value_t = DEFAULT_DATA_WIRE_SIZE)]
        size: usize,

        /// Uplink bandwidth in kbit/s
        #[clap(long, default_value = "1000")]
        bandwidth_kbps: u64,

        /// Uplink propagation delay in milliseconds
        #[clap(long, default_value = "0")]
        delay_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.verbose { "debug" } else { "info" },
    ))
    .init();

    let settings = NodeSettings::load(cli.settings.as_deref())?;
    debug!("Node settings: {:?}", settings);

    match cli.command {
        Commands::Router {
            name,
            bind,
            links,
            routes,
        } => {
            commands::router::run_router(name, bind, &links, &routes, settings).await?;
        }
        Commands::Subscribe {
            name,
            bind,
            router,
            flow,
            bandwidth_kbps,
            delay_ms,
            count,
        } => {
            commands::subscribe::run_subscriber(
                name,
                bind,
                router,
                flow,
                bandwidth_kbps,
                delay_ms,
                count,
                settings,
            )
            .await?;
        }
        Commands::Publish {
            name,
            bind,
            router,
            flow,
            count,
            size,
            bandwidth_kbps,
            delay_ms,
        } => {
            commands::publish::publish_flow(
                name,
                bind,
                router,
                flow,
                count,
                size,
                bandwidth_kbps,
                delay_ms,
                settings,
            )
            .await?;
        }
    }

    Ok(())
}
