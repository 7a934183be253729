//! Peer addresses and the per-session record of peers already reported.

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

/// Where a discovered display accepts signaling connections.
///
/// Identity is the literal `host:port` string, so `192.168.1.4:9999` found
/// over mDNS and over UDP broadcast is the same peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    host: String,
    port: u16,
}

impl PeerAddress {
    /// Create a peer address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host (usually an IP literal).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Signaling port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The `host:port` identity key used for deduplication.
    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<SocketAddr> for PeerAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

/// Identity keys already reported in the current discovery session.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRecord {
    seen: Arc<Mutex<HashSet<String>>>,
}

impl DiscoveryRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the peer's key, returning `true` if it was not yet present.
    ///
    /// Check and insert happen under one lock so two racing producers
    /// cannot both observe the peer as new.
    pub fn check_and_insert(&self, peer: &PeerAddress) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(peer.key())
    }

    /// Forget every peer.
    pub fn clear(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of distinct peers reported.
    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been reported yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_host_colon_port() {
        let peer = PeerAddress::new("192.168.1.20", 9999);
        assert_eq!(peer.key(), "192.168.1.20:9999");
        assert_eq!(peer.to_string(), peer.key());
    }

    #[test]
    fn from_socket_addr() {
        let addr: SocketAddr = "10.0.0.7:4242".parse().unwrap();
        let peer = PeerAddress::from(addr);
        assert_eq!(peer.host(), "10.0.0.7");
        assert_eq!(peer.port(), 4242);
    }

    #[test]
    fn record_reports_each_key_once() {
        let record = DiscoveryRecord::new();
        let peer = PeerAddress::new("10.0.0.2", 9999);

        assert!(record.check_and_insert(&peer));
        assert!(!record.check_and_insert(&peer));
        assert!(record.check_and_insert(&PeerAddress::new("10.0.0.2", 9998)));
        assert_eq!(record.len(), 2);

        record.clear();
        assert!(record.is_empty());
        assert!(record.check_and_insert(&peer));
    }

    #[test]
    fn record_clones_share_state() {
        let record = DiscoveryRecord::new();
        let other = record.clone();
        let peer = PeerAddress::new("10.0.0.3", 9999);

        assert!(record.check_and_insert(&peer));
        assert!(!other.check_and_insert(&peer));
    }
}
