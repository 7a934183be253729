use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use gametux_link::discovery::DEFAULT_UDP_PORT;
use gametux_link::signaling::DEFAULT_SIGNALING_PORT;
use gametux_link::{
    serve_sessions, Discovery, DiscoveryConfig, SessionHandler, SignalingConfig, SignalingServer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "display")]
#[clap(about = "Advertise a display on the LAN and answer session offers")]
struct Args {
    /// Signaling port to listen on and advertise
    #[clap(long, default_value_t = DEFAULT_SIGNALING_PORT)]
    port: u16,

    /// UDP port for broadcast announcements
    #[clap(long, default_value_t = DEFAULT_UDP_PORT)]
    udp_port: u16,

    /// Skip mDNS and announce over UDP only
    #[clap(long)]
    no_mdns: bool,

    /// Enable verbose logging
    #[clap(short, long)]
    verbose: bool,
}

/// Answers every offer with a canned description.
struct EchoAnswerer;

#[async_trait]
impl SessionHandler for EchoAnswerer {
    async fn on_offer(&self, description: String) -> Option<String> {
        info!(%description, "Offer received");
        Some(format!("display-answer-for({description})"))
    }

    async fn on_ice_candidate(&self, candidate: String) {
        info!(%candidate, "Candidate received");
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

    let server = SignalingServer::new(SignalingConfig::default().port(args.port));
    let addr = serve_sessions(&server, Arc::new(EchoAnswerer)).await?;
    info!(%addr, "Waiting for consoles");

    let config = DiscoveryConfig::default().udp_port(args.udp_port);
    let discovery = if args.no_mdns {
        Discovery::new(config)
    } else {
        Discovery::on_lan(config)
    };
    discovery.start_advertising(addr.port()).await;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    discovery.stop_advertising().await;
    server.stop().await;
    Ok(())
}
