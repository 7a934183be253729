//! Signaling configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Port the display's signaling server listens on.
pub const DEFAULT_SIGNALING_PORT: u16 = 9999;

/// Configuration shared by [`SignalingClient`](super::SignalingClient) and
/// [`SignalingServer`](super::SignalingServer).
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Server listen port. Default: 9999.
    pub port: u16,
    /// Server bind address. Default: 0.0.0.0.
    pub bind_addr: IpAddr,
    /// Client connect timeout. Default: 5 seconds.
    pub connect_timeout: Duration,
    /// How long either side waits for the other's line. Default: 10 seconds.
    pub read_timeout: Duration,
    /// How long the server keeps a connection open waiting for the handler
    /// to respond. Default: 30 seconds.
    pub handler_timeout: Duration,
    /// Longest accepted line in bytes, excluding the newline. Default: 256 KiB.
    pub max_line_len: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SIGNALING_PORT,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            handler_timeout: Duration::from_secs(30),
            max_line_len: 256 * 1024,
        }
    }
}

impl SignalingConfig {
    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the server bind address.
    pub fn bind_addr(mut self, addr: IpAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the client connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the line read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set how long the server waits for a handler response.
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Set the maximum line length.
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }

    pub(crate) fn listen_socket(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
