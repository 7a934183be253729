//! Multicast DNS-SD backend using `mdns-sd`.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tracing::{debug, info, trace, warn};

use super::{ResolvedFeed, ServiceDirectory, SERVICE_NAME, SERVICE_TYPE};
use crate::peer::PeerAddress;
use crate::Result;

const PROP_VERSION: &str = "version";

/// Service directory backed by an mDNS daemon.
pub struct MdnsDirectory {
    daemon: ServiceDaemon,
    owns_daemon: bool,
    service_type: String,
    service_name: String,
    registered: Mutex<Option<String>>,
    browsing: AtomicBool,
}

impl MdnsDirectory {
    /// Start a private mDNS daemon for the default service type and name.
    pub fn new() -> Result<Self> {
        let daemon = ServiceDaemon::new()?;
        let mut directory = Self::with_daemon(daemon, SERVICE_TYPE, SERVICE_NAME);
        directory.owns_daemon = true;
        Ok(directory)
    }

    /// Use an existing daemon. The daemon is not shut down on drop.
    pub fn with_daemon(
        daemon: ServiceDaemon,
        service_type: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            daemon,
            owns_daemon: false,
            service_type: service_type.into(),
            service_name: service_name.into(),
            registered: Mutex::new(None),
            browsing: AtomicBool::new(false),
        }
    }

    /// Override the instance name used for registration and browse filtering.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }
}

impl ServiceDirectory for MdnsDirectory {
    fn name(&self) -> &'static str {
        "mdns"
    }

    fn advertise(&self, port: u16) -> Result<()> {
        let mut registered = self
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if registered.is_some() {
            debug!("mDNS: already registered");
            return Ok(());
        }

        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "gametux-display".into());

        let properties = [(
            PROP_VERSION.to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        )];

        let service = ServiceInfo::new(
            &self.service_type,
            &self.service_name,
            &format!("{host}.local."),
            "",
            port,
            &properties[..],
        )?
        .enable_addr_auto();

        let fullname = service.get_fullname().to_string();
        self.daemon.register(service)?;

        info!(name = %fullname, port, "mDNS: registered service");
        *registered = Some(fullname);
        Ok(())
    }

    fn stop_advertising(&self) -> Result<()> {
        let fullname = self
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(fullname) = fullname {
            self.daemon.unregister(&fullname)?;
            debug!(name = %fullname, "mDNS: unregistered service");
        }
        Ok(())
    }

    fn browse(&self) -> Result<ResolvedFeed> {
        let receiver = self.daemon.browse(&self.service_type)?;
        self.browsing.store(true, Ordering::SeqCst);
        debug!(service_type = %self.service_type, "mDNS: browse started");

        let service_type = self.service_type.clone();
        let service_name = self.service_name.clone();

        let feed = futures_util::stream::unfold(receiver, move |receiver| {
            let service_type = service_type.clone();
            let service_name = service_name.clone();
            async move {
                loop {
                    match receiver.recv_async().await {
                        Ok(event) => {
                            if let Some(peer) =
                                resolve_event(&service_type, &service_name, event)
                            {
                                return Some((peer, receiver));
                            }
                        }
                        Err(_) => {
                            debug!("mDNS: browse channel closed");
                            return None;
                        }
                    }
                }
            }
        });

        Ok(Box::pin(feed))
    }

    fn stop_browsing(&self) -> Result<()> {
        if self.browsing.swap(false, Ordering::SeqCst) {
            self.daemon.stop_browse(&self.service_type)?;
        }
        Ok(())
    }
}

impl Drop for MdnsDirectory {
    fn drop(&mut self) {
        if let Err(e) = self.stop_advertising() {
            warn!(error = %e, "mDNS: failed to unregister");
        }
        if let Err(e) = self.stop_browsing() {
            warn!(error = %e, "mDNS: failed to stop browsing");
        }
        if self.owns_daemon {
            let _ = self.daemon.shutdown();
        }
    }
}

/// Turn a browse event into an address, logging everything else.
fn resolve_event(
    service_type: &str,
    service_name: &str,
    event: ServiceEvent,
) -> Option<PeerAddress> {
    match event {
        ServiceEvent::ServiceFound(_, fullname) => {
            debug!(name = %fullname, "mDNS: service found");
            None
        }
        ServiceEvent::ServiceResolved(info) => {
            if info.get_type() != service_type || !info.get_fullname().contains(service_name) {
                trace!(name = %info.get_fullname(), "mDNS: ignoring unrelated service");
                return None;
            }
            let Some(addr) = pick_address(info.get_addresses().iter().copied()) else {
                warn!(name = %info.get_fullname(), "mDNS: resolved without an address");
                return None;
            };
            let peer = PeerAddress::new(addr.to_string(), info.get_port());
            debug!(%peer, source = "mdns", "Service resolved");
            Some(peer)
        }
        ServiceEvent::ServiceRemoved(_, fullname) => {
            debug!(name = %fullname, "mDNS: service lost");
            None
        }
        other => {
            trace!(event = ?other, "mDNS: browse event");
            None
        }
    }
}

/// Prefer IPv4 so the key matches what the UDP fallback reports.
fn pick_address(addrs: impl Iterator<Item = IpAddr>) -> Option<IpAddr> {
    let mut fallback = None;
    for addr in addrs {
        if addr.is_ipv4() {
            return Some(addr);
        }
        fallback.get_or_insert(addr);
    }
    fallback
}
