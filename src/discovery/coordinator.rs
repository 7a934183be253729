//! Lifecycle and fan-in for both discovery roles.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use super::config::DiscoveryConfig;
use super::stream::PeerStream;
use crate::broadcast::{AnnouncementListener, Announcer};
use crate::directory::{MdnsDirectory, ServiceDirectory};
use crate::peer::{DiscoveryRecord, PeerAddress};

/// A peer as reported by one of the two paths, before deduplication.
type Sighting = (PeerAddress, &'static str);

enum Lifecycle<T> {
    NotStarted,
    Running(T),
    Stopped,
}

impl<T> Lifecycle<T> {
    fn is_running(&self) -> bool {
        matches!(self, Lifecycle::Running(_))
    }

    /// Move to `Stopped`, returning the running session if there was one.
    fn stop(&mut self) -> Option<T> {
        match std::mem::replace(self, Lifecycle::Stopped) {
            Lifecycle::Running(session) => Some(session),
            other => {
                *self = other;
                None
            }
        }
    }
}

struct BrowseSession {
    shutdown_tx: broadcast::Sender<()>,
    tasks: JoinSet<()>,
}

struct AdvertiseSession {
    port: u16,
    announcer: Announcer,
}

/// Owns the directory handle and UDP sockets of one discovery participant.
///
/// The browser and advertiser roles have independent lifecycles
/// (not started, running, stopped). Starting a running role is a no-op;
/// stopping a role that is not running is a no-op.
pub struct Discovery {
    config: DiscoveryConfig,
    directory: Option<Arc<dyn ServiceDirectory>>,
    record: DiscoveryRecord,
    browsing: Mutex<Lifecycle<BrowseSession>>,
    advertising: Mutex<Lifecycle<AdvertiseSession>>,
}

impl Discovery {
    /// Discovery with the UDP fallback only.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config,
            directory: None,
            record: DiscoveryRecord::new(),
            browsing: Mutex::new(Lifecycle::NotStarted),
            advertising: Mutex::new(Lifecycle::NotStarted),
        }
    }

    /// Discovery with a service directory plus the UDP fallback.
    pub fn with_directory(config: DiscoveryConfig, directory: Arc<dyn ServiceDirectory>) -> Self {
        Self {
            directory: Some(directory),
            ..Self::new(config)
        }
    }

    /// Discovery over mDNS plus the UDP fallback.
    ///
    /// If no mDNS daemon can be started, the UDP fallback is used alone.
    pub fn on_lan(config: DiscoveryConfig) -> Self {
        match MdnsDirectory::new() {
            Ok(mdns) => Self::with_directory(config, Arc::new(mdns)),
            Err(e) => {
                warn!(error = %e, "mDNS unavailable, using UDP fallback only");
                Self::new(config)
            }
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Whether the browser role is running.
    pub async fn is_discovering(&self) -> bool {
        self.browsing.lock().await.is_running()
    }

    /// Whether the advertiser role is running.
    pub async fn is_advertising(&self) -> bool {
        self.advertising.lock().await.is_running()
    }

    /// Start browsing, invoking `on_peer_found` once per new `host:port`.
    ///
    /// Clears the record of peers seen in the previous session, then starts
    /// the directory browse and the UDP listener. Whichever path reports a
    /// peer first wins; later sightings are dropped. Returns `false` if
    /// discovery was already running.
    pub async fn start_discovery<F>(&self, on_peer_found: F) -> bool
    where
        F: Fn(PeerAddress) + Send + 'static,
    {
        let mut state = self.browsing.lock().await;
        if state.is_running() {
            debug!("Discovery already running");
            return false;
        }

        self.record.clear();
        let (shutdown_tx, _) = broadcast::channel(1);
        let (sighting_tx, mut sighting_rx) = mpsc::unbounded_channel::<Sighting>();
        let mut tasks = JoinSet::new();

        if let Some(directory) = &self.directory {
            let source = directory.name();
            match directory.browse() {
                Ok(mut feed) => {
                    let tx = sighting_tx.clone();
                    let mut shutdown_rx = shutdown_tx.subscribe();
                    tasks.spawn(async move {
                        loop {
                            tokio::select! {
                                next = feed.next() => match next {
                                    Some(peer) => {
                                        if tx.send((peer, source)).is_err() {
                                            break;
                                        }
                                    }
                                    None => {
                                        debug!(source, "Directory feed ended");
                                        break;
                                    }
                                },
                                _ = shutdown_rx.recv() => break,
                            }
                        }
                    });
                }
                Err(e) => {
                    warn!(source, error = %e, "Directory browse failed, UDP fallback only")
                }
            }
        }

        match AnnouncementListener::bind(self.config.listen_socket()).await {
            Ok(listener) => {
                let tx = sighting_tx.clone();
                tasks.spawn(listener.run(shutdown_tx.subscribe(), move |peer| {
                    let _ = tx.send((peer, "udp"));
                }));
            }
            Err(e) => warn!(
                addr = %self.config.listen_socket(),
                error = %e,
                "UDP listener unavailable, directory only"
            ),
        }

        // Only the producers hold senders now; the consumer ends with them.
        drop(sighting_tx);

        let record = self.record.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tasks.spawn(async move {
            loop {
                tokio::select! {
                    next = sighting_rx.recv() => match next {
                        Some((peer, source)) => {
                            if record.check_and_insert(&peer) {
                                info!(%peer, source, "Discovered peer");
                                on_peer_found(peer);
                            } else {
                                trace!(%peer, source, "Skipping duplicate");
                            }
                        }
                        None => {
                            debug!("All discovery paths ended");
                            break;
                        }
                    },
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        info!("Discovery started");
        *state = Lifecycle::Running(BrowseSession { shutdown_tx, tasks });
        true
    }

    /// Start browsing and return the found peers as a stream.
    ///
    /// Returns `None` if discovery was already running.
    pub async fn discover(&self) -> Option<PeerStream> {
        let (stream, tx) = PeerStream::new();
        let started = self
            .start_discovery(move |peer| {
                let _ = tx.send(peer);
            })
            .await;
        started.then_some(stream)
    }

    /// Stop browsing, closing the UDP socket and the directory browse.
    pub async fn stop_discovery(&self) {
        let mut state = self.browsing.lock().await;
        let Some(mut session) = state.stop() else {
            return;
        };

        let _ = session.shutdown_tx.send(());
        if let Some(directory) = &self.directory {
            if let Err(e) = directory.stop_browsing() {
                warn!(
                    source = directory.name(),
                    error = %e,
                    "Failed to stop directory browse"
                );
            }
        }
        session.tasks.shutdown().await;
        info!("Discovery stopped");
    }

    /// Advertise `port` on the directory and via UDP announcements.
    ///
    /// Returns `false` if already advertising.
    pub async fn start_advertising(&self, port: u16) -> bool {
        let mut state = self.advertising.lock().await;
        if state.is_running() {
            debug!("Advertising already running");
            return false;
        }

        if let Some(directory) = &self.directory {
            if let Err(e) = directory.advertise(port) {
                warn!(
                    source = directory.name(),
                    error = %e,
                    "Directory registration failed, UDP announcements only"
                );
            }
        }

        let mut announcer =
            Announcer::new(self.config.announce_target(), self.config.announce_interval);
        if let Err(e) = announcer.start(port).await {
            warn!(error = %e, "UDP announcer unavailable, directory only");
        }

        info!(port, "Advertising started");
        *state = Lifecycle::Running(AdvertiseSession { port, announcer });
        true
    }

    /// Withdraw the directory registration and stop announcing.
    pub async fn stop_advertising(&self) {
        let mut state = self.advertising.lock().await;
        let Some(mut session) = state.stop() else {
            return;
        };

        if let Some(directory) = &self.directory {
            if let Err(e) = directory.stop_advertising() {
                warn!(source = directory.name(), error = %e, "Failed to unregister");
            }
        }
        session.announcer.stop().await;
        info!(port = session.port, "Advertising stopped");
    }
}
