//! In-process service directory.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use super::{ResolvedFeed, ServiceDirectory};
use crate::peer::PeerAddress;
use crate::Result;

#[derive(Debug)]
struct Hub {
    registered: Mutex<HashSet<PeerAddress>>,
    tx: broadcast::Sender<PeerAddress>,
}

impl Hub {
    fn snapshot(&self) -> Vec<PeerAddress> {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// A directory shared by handles in the same process.
///
/// Every handle created with [`attach`](Self::attach) sees registrations made
/// through any other handle on the same hub. Each handle advertises under its
/// own host and withdraws only its own registration.
#[derive(Debug)]
pub struct LocalDirectory {
    hub: Arc<Hub>,
    host: String,
    advertised: Mutex<Option<PeerAddress>>,
}

impl LocalDirectory {
    /// Create a new hub with a handle advertising as `127.0.0.1`.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let hub = Arc::new(Hub {
            registered: Mutex::new(HashSet::new()),
            tx,
        });
        Self::with_hub(hub, "127.0.0.1")
    }

    fn with_hub(hub: Arc<Hub>, host: impl Into<String>) -> Self {
        Self {
            hub,
            host: host.into(),
            advertised: Mutex::new(None),
        }
    }

    /// Create another handle on the same hub advertising as `host`.
    pub fn attach(&self, host: impl Into<String>) -> Self {
        Self::with_hub(Arc::clone(&self.hub), host)
    }

    /// Addresses currently registered on the hub.
    pub fn registered(&self) -> Vec<PeerAddress> {
        self.hub.snapshot()
    }
}

impl Default for LocalDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceDirectory for LocalDirectory {
    fn name(&self) -> &'static str {
        "local"
    }

    fn advertise(&self, port: u16) -> Result<()> {
        let mut advertised = self
            .advertised
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if advertised.is_some() {
            return Ok(());
        }
        let peer = PeerAddress::new(self.host.clone(), port);
        self.hub
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(peer.clone());
        debug!(%peer, "local directory: registered");
        // No browsers yet is fine; they pick up the registration set.
        let _ = self.hub.tx.send(peer.clone());
        *advertised = Some(peer);
        Ok(())
    }

    fn stop_advertising(&self) -> Result<()> {
        let advertised = self
            .advertised
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(peer) = advertised {
            self.hub
                .registered
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&peer);
            debug!(%peer, "local directory: unregistered");
        }
        Ok(())
    }

    fn browse(&self) -> Result<ResolvedFeed> {
        // Subscribe before the snapshot so nothing registered in between is
        // missed. A peer may then appear twice; consumers dedup. A lagging
        // feed replays the current registrations.
        let hub = Arc::clone(&self.hub);
        let live = BroadcastStream::new(self.hub.tx.subscribe()).flat_map(move |msg| {
            let peers = match msg {
                Ok(peer) => vec![peer],
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    warn!(missed, "local directory: browse feed lagged, replaying");
                    hub.snapshot()
                }
            };
            futures_util::stream::iter(peers)
        });
        let existing = futures_util::stream::iter(self.registered());
        Ok(existing.chain(live).boxed())
    }

    // Feeds hold their own subscription and end when dropped.
    fn stop_browsing(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn browse_sees_existing_and_new_registrations() {
        let hub = LocalDirectory::new();
        let first = hub.attach("10.0.0.1");
        let second = hub.attach("10.0.0.2");

        first.advertise(9999).unwrap();
        let mut feed = hub.browse().unwrap();
        second.advertise(9999).unwrap();

        let a = tokio::time::timeout(Duration::from_secs(1), feed.next())
            .await
            .unwrap()
            .unwrap();
        let b = tokio::time::timeout(Duration::from_secs(1), feed.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a, PeerAddress::new("10.0.0.1", 9999));
        assert_eq!(b, PeerAddress::new("10.0.0.2", 9999));
    }

    #[tokio::test]
    async fn lagging_feed_still_reports_every_registration() {
        let hub = LocalDirectory::with_capacity(1);
        let mut feed = hub.browse().unwrap();
        for host in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
            hub.attach(host).advertise(9999).unwrap();
        }

        let mut seen = HashSet::new();
        while seen.len() < 3 {
            let peer = tokio::time::timeout(Duration::from_secs(1), feed.next())
                .await
                .expect("registration should be replayed")
                .unwrap();
            seen.insert(peer.key());
        }
        assert!(seen.contains("10.0.0.1:9999"));
    }

    #[test]
    fn stop_advertising_only_removes_own_registration() {
        let hub = LocalDirectory::new();
        let first = hub.attach("10.0.0.1");
        let second = hub.attach("10.0.0.2");

        first.advertise(9999).unwrap();
        second.advertise(9999).unwrap();
        first.stop_advertising().unwrap();
        first.stop_advertising().unwrap();

        assert_eq!(hub.registered(), vec![PeerAddress::new("10.0.0.2", 9999)]);
    }

    #[test]
    fn stops_are_safe_when_never_started() {
        let directory = LocalDirectory::new();
        assert!(directory.stop_advertising().is_ok());
        assert!(directory.stop_browsing().is_ok());
    }
}
