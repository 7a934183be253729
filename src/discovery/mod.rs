//! Discovery coordinator: one surface over the directory and UDP paths.
//!
//! [`Discovery`] runs both paths concurrently for each role:
//!
//! - **Advertiser** (display): registers with the service directory and
//!   broadcasts UDP announcements, both bound to the signaling port.
//! - **Browser** (console): browses the directory and listens for UDP
//!   announcements, fanning both into one consumer that reports each
//!   `host:port` at most once per session.
//!
//! A failure on one path is logged and never stops the other.
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use gametux_link::discovery::{Discovery, DiscoveryConfig};
//!
//! # async fn run() {
//! let discovery = Discovery::on_lan(DiscoveryConfig::default());
//! if let Some(mut peers) = discovery.discover().await {
//!     if let Some(peer) = peers.next().await {
//!         println!("display at {peer}");
//!     }
//! }
//! discovery.stop_discovery().await;
//! # }
//! ```

mod config;
mod coordinator;
mod stream;

pub use config::{DiscoveryConfig, DEFAULT_ANNOUNCE_INTERVAL, DEFAULT_UDP_PORT};
pub use coordinator::Discovery;
pub use stream::PeerStream;
