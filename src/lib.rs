//! LAN discovery and signaling for pairing a GameTux console with a display.
//!
//! A display advertises itself two ways at once: a DNS-SD record on the
//! [`directory`] and a periodic UDP [`broadcast`] announcement. A console runs
//! [`Discovery`] to learn each display's signaling address exactly once, then
//! hands its session offer to the display over the [`signaling`] channel via
//! [`SignalingSession`].

#![deny(missing_docs)]

pub mod broadcast;
pub mod directory;
pub mod discovery;
pub mod error;
pub mod peer;
pub mod session;
pub mod signaling;

// Re-export key types
pub use directory::{LocalDirectory, MdnsDirectory, ServiceDirectory};
pub use discovery::{Discovery, DiscoveryConfig, PeerStream};
pub use error::{Error, Result};
pub use peer::{DiscoveryRecord, PeerAddress};
pub use session::{serve_sessions, SessionHandler, SessionSignaling, SignalingSession};
pub use signaling::{Responder, SignalingClient, SignalingConfig, SignalingMessage, SignalingServer};
