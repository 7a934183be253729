//! Discovery configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// UDP port announcements are sent to and received on.
pub const DEFAULT_UDP_PORT: u16 = 8888;

/// Delay between two announcements.
pub const DEFAULT_ANNOUNCE_INTERVAL: Duration = Duration::from_millis(2000);

/// Configuration for [`Discovery`](super::Discovery).
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// UDP port for the broadcast fallback. Default: 8888.
    pub udp_port: u16,
    /// How often the advertiser announces itself. Default: 2 seconds.
    pub announce_interval: Duration,
    /// Where announcements are sent. Default: 255.255.255.255.
    pub broadcast_addr: Ipv4Addr,
    /// Local address the announcement listener binds. Default: 0.0.0.0.
    pub listen_addr: IpAddr,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            udp_port: DEFAULT_UDP_PORT,
            announce_interval: DEFAULT_ANNOUNCE_INTERVAL,
            broadcast_addr: Ipv4Addr::BROADCAST,
            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl DiscoveryConfig {
    /// Set the UDP fallback port.
    pub fn udp_port(mut self, port: u16) -> Self {
        self.udp_port = port;
        self
    }

    /// Set the announcement interval.
    pub fn announce_interval(mut self, interval: Duration) -> Self {
        self.announce_interval = interval;
        self
    }

    /// Set the announcement destination address.
    pub fn broadcast_addr(mut self, addr: Ipv4Addr) -> Self {
        self.broadcast_addr = addr;
        self
    }

    /// Set the listener bind address.
    pub fn listen_addr(mut self, addr: IpAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub(crate) fn announce_target(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(self.broadcast_addr), self.udp_port)
    }

    pub(crate) fn listen_socket(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.udp_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wire_constants() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.announce_target(), "255.255.255.255:8888".parse().unwrap());
        assert_eq!(config.listen_socket(), "0.0.0.0:8888".parse().unwrap());
        assert_eq!(config.announce_interval, Duration::from_secs(2));
    }

    #[test]
    fn setters_override_defaults() {
        let config = DiscoveryConfig::default()
            .udp_port(18888)
            .broadcast_addr(Ipv4Addr::LOCALHOST)
            .listen_addr(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .announce_interval(Duration::from_millis(50));
        assert_eq!(config.announce_target(), "127.0.0.1:18888".parse().unwrap());
        assert_eq!(config.listen_socket(), "127.0.0.1:18888".parse().unwrap());
    }
}
