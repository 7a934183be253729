//! Receiver side of the UDP broadcast fallback.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::announcement::{parse_announcement, MAX_ANNOUNCEMENT_LEN};
use crate::peer::PeerAddress;
use crate::Result;

/// Pause after a failed receive so a persistent error does not spin.
const RECV_BACKOFF: Duration = Duration::from_millis(100);

/// Outcome of one `recv_from`.
#[derive(Debug, PartialEq)]
enum Received {
    Peer(PeerAddress),
    Ignored,
    Failed,
}

fn classify(result: io::Result<(usize, SocketAddr)>, buf: &[u8]) -> Received {
    match result {
        Ok((len, src)) => match parse_announcement(&buf[..len]) {
            Some(port) => {
                let peer = PeerAddress::new(src.ip().to_string(), port);
                debug!(%peer, source = "udp", "Received announcement");
                Received::Peer(peer)
            }
            None => {
                trace!(%src, len, "Ignoring malformed datagram");
                Received::Ignored
            }
        },
        Err(e) => {
            warn!(error = %e, "UDP receive failed");
            Received::Failed
        }
    }
}

/// A bound UDP socket waiting for display announcements.
#[derive(Debug)]
pub struct AnnouncementListener {
    socket: UdpSocket,
}

impl AnnouncementListener {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        debug!(%addr, "Bound UDP announcement listener");
        Ok(Self { socket })
    }

    /// The address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the receive loop on its own task. See [`run`](Self::run).
    pub fn spawn<F>(self, shutdown_rx: broadcast::Receiver<()>, on_found: F) -> JoinHandle<()>
    where
        F: Fn(PeerAddress) + Send + 'static,
    {
        tokio::spawn(self.run(shutdown_rx, on_found))
    }

    /// Receive announcements until shutdown.
    ///
    /// For every datagram that parses as an announcement, `on_found` is
    /// called with the sender's IP and the announced port. Malformed
    /// datagrams are dropped. The loop ends when `shutdown_rx` fires (or
    /// its sender is dropped), which also closes the socket.
    pub async fn run<F>(self, mut shutdown_rx: broadcast::Receiver<()>, on_found: F)
    where
        F: Fn(PeerAddress) + Send + 'static,
    {
        let socket = self.socket;
        info!(addr = ?socket.local_addr().ok(), "Listening for UDP announcements");
        let mut buf = vec![0u8; MAX_ANNOUNCEMENT_LEN];

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => match classify(result, &buf) {
                    Received::Peer(peer) => on_found(peer),
                    Received::Ignored => {}
                    Received::Failed => tokio::time::sleep(RECV_BACKOFF).await,
                },
                _ = shutdown_rx.recv() => {
                    debug!("UDP listener shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn receive_errors_back_off() {
        let src: SocketAddr = "192.168.1.8:40000".parse().unwrap();
        let datagram = b"GAMETUX_DISPLAY:9999";
        let mut buf = [0u8; MAX_ANNOUNCEMENT_LEN];
        buf[..datagram.len()].copy_from_slice(datagram);

        assert_eq!(
            classify(Ok((datagram.len(), src)), &buf),
            Received::Peer(PeerAddress::new("192.168.1.8", 9999))
        );
        assert_eq!(classify(Ok((3, src)), &buf), Received::Ignored);
        assert_eq!(
            classify(Err(io::ErrorKind::ConnectionRefused.into()), &buf),
            Received::Failed
        );
    }

    #[tokio::test]
    async fn reports_sender_ip_and_announced_port() {
        let listener = AnnouncementListener::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = listener.spawn(shutdown_rx, move |peer| {
            let _ = tx.send(peer);
        });

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"not an announcement", addr).await.unwrap();
        sender.send_to(b"GAMETUX_DISPLAY:oops", addr).await.unwrap();
        sender.send_to(b"GAMETUX_DISPLAY:9999", addr).await.unwrap();

        let peer = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("announcement should be reported")
            .unwrap();
        assert_eq!(peer, PeerAddress::new("127.0.0.1", 9999));
        assert!(rx.try_recv().is_err());

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("listener should exit on shutdown")
            .unwrap();
    }
}
