use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use futures_util::StreamExt;
use gametux_link::discovery::DEFAULT_UDP_PORT;
use gametux_link::{Discovery, DiscoveryConfig, PeerAddress, SessionSignaling, SignalingSession};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "console")]
#[clap(about = "Find a display on the LAN and hand it a session offer")]
struct Args {
    /// Connect to this host:port instead of discovering
    #[clap(long)]
    connect_to: Option<String>,

    /// UDP port to listen for announcements on
    #[clap(long, default_value_t = DEFAULT_UDP_PORT)]
    udp_port: u16,

    /// Skip mDNS and listen for UDP announcements only
    #[clap(long)]
    no_mdns: bool,

    /// Seconds to wait for a display
    #[clap(long, default_value = "10")]
    timeout: u64,

    /// Offer to send
    #[clap(long, default_value = "console-offer")]
    offer: String,

    /// Enable verbose logging
    #[clap(short, long)]
    verbose: bool,
}

async fn find_display(args: &Args) -> Result<PeerAddress> {
    let config = DiscoveryConfig::default().udp_port(args.udp_port);
    let discovery = if args.no_mdns {
        Discovery::new(config)
    } else {
        Discovery::on_lan(config)
    };

    let Some(mut peers) = discovery.discover().await else {
        bail!("discovery already running");
    };
    let found = tokio::time::timeout(Duration::from_secs(args.timeout), peers.next()).await;
    discovery.stop_discovery().await;

    match found {
        Ok(Some(peer)) => Ok(peer),
        _ => bail!("no display found within {}s", args.timeout),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let peer = match &args.connect_to {
        Some(target) => {
            let Some((host, port)) = target.rsplit_once(':') else {
                bail!("expected host:port, got {target}");
            };
            PeerAddress::new(host, port.parse()?)
        }
        None => find_display(&args).await?,
    };
    info!(%peer, "Using display");

    let session = SignalingSession::new(peer);
    match session.send_offer(&args.offer).await {
        Some(answer) => info!(%answer, "Session answered"),
        None => {
            warn!("Display did not answer");
            return Ok(());
        }
    }

    for n in 1..=3 {
        session.send_ice_candidate(&format!("candidate:{n}")).await;
    }
    info!("Candidates sent");
    Ok(())
}
