//! Periodic UDP broadcast of the display's signaling port.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::announcement::encode_announcement;
use crate::Result;

/// Sends `GAMETUX_DISPLAY:<port>` to a broadcast target on a fixed interval.
#[derive(Debug)]
pub struct Announcer {
    target: SocketAddr,
    interval: Duration,
    shutdown_tx: Option<broadcast::Sender<()>>,
    task_handle: Option<JoinHandle<()>>,
}

impl Announcer {
    /// Create an announcer that will send to `target` every `interval`.
    pub fn new(target: SocketAddr, interval: Duration) -> Self {
        Self {
            target,
            interval,
            shutdown_tx: None,
            task_handle: None,
        }
    }

    /// Whether the send loop is running.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Bind an ephemeral socket and start announcing `port`.
    ///
    /// Fails only if the socket cannot be set up. Individual send errors are
    /// logged and the loop keeps going. Calling this while running is a no-op.
    pub async fn start(&mut self, port: u16) -> Result<()> {
        if self.task_handle.is_some() {
            warn!("UDP announcer already started");
            return Ok(());
        }

        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let target = self.target;
        let period = self.interval;
        let payload = encode_announcement(port);

        let handle = tokio::spawn(async move {
            info!(%target, port, "Starting UDP announcer");

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match socket.send_to(&payload, target).await {
                            Ok(n) => trace!(%target, bytes = n, "Sent announcement"),
                            Err(e) => warn!(%target, error = %e, "Failed to send announcement"),
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("UDP announcer shutting down");
                        break;
                    }
                }
            }
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task_handle = Some(handle);
        Ok(())
    }

    /// Stop announcing and close the socket. Safe to call when not started.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Announcer {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::parse_announcement;

    #[tokio::test]
    async fn announces_repeatedly_until_stopped() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();

        let mut announcer = Announcer::new(target, Duration::from_millis(20));
        announcer.start(9999).await.unwrap();
        assert!(announcer.is_running());

        let mut buf = [0u8; 64];
        for _ in 0..2 {
            let (n, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
                .await
                .expect("announcement should arrive")
                .unwrap();
            assert_eq!(parse_announcement(&buf[..n]), Some(9999));
        }

        announcer.stop().await;
        assert!(!announcer.is_running());
    }

    #[tokio::test]
    async fn stop_without_start_is_harmless() {
        let mut announcer = Announcer::new("127.0.0.1:9".parse().unwrap(), Duration::from_secs(1));
        announcer.stop().await;
        announcer.stop().await;
        assert!(!announcer.is_running());
    }
}
