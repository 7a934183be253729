//! Display side of the signaling channel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::config::SignalingConfig;
use super::line::{read_line, write_line};
use crate::{Error, Result};

/// Pause after a failed `accept` so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// One-shot reply handle for a received message.
///
/// Calling [`respond`](Self::respond) writes the line and closes the
/// connection. Dropping the responder closes the connection without a reply.
#[derive(Debug)]
pub struct Responder {
    tx: oneshot::Sender<String>,
}

impl Responder {
    /// Send `line` back to the client.
    pub fn respond(self, line: impl Into<String>) {
        // The connection may already have timed out.
        let _ = self.tx.send(line.into());
    }
}

struct Running {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// Accepts signaling connections and hands each request line to a handler.
///
/// Connections are handled concurrently; a slow or silent client never
/// blocks the others. Every connection is closed once its exchange ends,
/// whether or not the handler responded.
pub struct SignalingServer {
    config: SignalingConfig,
    running: Mutex<Option<Running>>,
}

impl SignalingServer {
    /// A stopped server.
    pub fn new(config: SignalingConfig) -> Self {
        Self {
            config,
            running: Mutex::new(None),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SignalingConfig {
        &self.config
    }

    /// Whether the accept loop is running.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// The bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Bind and start accepting connections.
    ///
    /// `on_message` is called once per connection with the request line and
    /// a [`Responder`]. It may respond right away or move the responder into
    /// a task and respond later, within `handler_timeout`.
    ///
    /// Starting a running server is a no-op that returns the bound address.
    pub async fn start<F>(&self, on_message: F) -> Result<SocketAddr>
    where
        F: Fn(String, Responder) + Send + Sync + 'static,
    {
        let mut running = self.running.lock().await;
        if let Some(running) = running.as_ref() {
            debug!(addr = %running.local_addr, "Signaling server already running");
            return Ok(running.local_addr);
        }

        let listener = TcpListener::bind(self.config.listen_socket()).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::new(on_message),
            self.config.clone(),
            shutdown_rx,
        ));

        info!(addr = %local_addr, "Signaling server listening");
        *running = Some(Running {
            local_addr,
            shutdown_tx,
            task,
        });
        Ok(local_addr)
    }

    /// Stop accepting and close open connections. Safe to call repeatedly.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        let _ = running.shutdown_tx.send(());
        if let Err(e) = running.task.await {
            warn!(error = %e, "Signaling accept loop failed");
        }
        info!(addr = %running.local_addr, "Signaling server stopped");
    }
}

impl Drop for SignalingServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.task.abort();
        }
    }
}

async fn accept_loop<F>(
    listener: TcpListener,
    on_message: Arc<F>,
    config: SignalingConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    F: Fn(String, Responder) + Send + Sync + 'static,
{
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "Accepted signaling connection");
                    connections.spawn(handle_connection(
                        stream,
                        peer,
                        Arc::clone(&on_message),
                        config.clone(),
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "Signaling accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(joined) = connections.join_next() => {
                if let Err(e) = joined {
                    warn!(error = %e, "Signaling connection task failed");
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    // Dropping the listener here refuses new connections.
    connections.shutdown().await;
}

async fn handle_connection<F>(
    stream: TcpStream,
    peer: SocketAddr,
    on_message: Arc<F>,
    config: SignalingConfig,
) where
    F: Fn(String, Responder) + Send + Sync + 'static,
{
    let mut stream = BufReader::new(stream);

    let line = match timeout(config.read_timeout, read_line(&mut stream, config.max_line_len)).await
    {
        Ok(Ok(line)) => line,
        Ok(Err(Error::ConnectionClosed)) => {
            debug!(%peer, "Client closed before sending a message");
            return;
        }
        Ok(Err(e)) => {
            warn!(%peer, error = %e, "Failed to read signaling message");
            return;
        }
        Err(_) => {
            warn!(%peer, "Timed out waiting for signaling message");
            return;
        }
    };
    debug!(%peer, len = line.len(), "Received signaling message");

    let (tx, rx) = oneshot::channel();
    on_message(line, Responder { tx });

    match timeout(config.handler_timeout, rx).await {
        Ok(Ok(response)) => {
            if let Err(e) = write_line(&mut stream, &response).await {
                warn!(%peer, error = %e, "Failed to write signaling response");
            }
        }
        Ok(Err(_)) => debug!(%peer, "No response for message"),
        Err(_) => warn!(%peer, "Handler did not respond in time"),
    }

    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use crate::peer::PeerAddress;
    use crate::signaling::SignalingClient;

    fn loopback_config() -> SignalingConfig {
        SignalingConfig::default()
            .port(0)
            .bind_addr(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    #[tokio::test]
    async fn start_twice_keeps_the_first_listener() {
        let server = SignalingServer::new(loopback_config());
        let first = server.start(|_, r| r.respond("A")).await.unwrap();
        let second = server.start(|_, r| r.respond("B")).await.unwrap();
        assert_eq!(first, second);

        let client = SignalingClient::new(PeerAddress::from(first));
        assert_eq!(client.send("OFFER:x").await.as_deref(), Some("A"));

        server.stop().await;
        server.stop().await;
        assert!(!server.is_running().await);
        assert!(server.local_addr().await.is_none());
    }

    #[tokio::test]
    async fn deferred_response_is_delivered() {
        let server = SignalingServer::new(loopback_config());
        let addr = server
            .start(|line, responder| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    responder.respond(format!("echo {line}"));
                });
            })
            .await
            .unwrap();

        let client = SignalingClient::new(PeerAddress::from(addr));
        assert_eq!(client.send("ICE:c").await.as_deref(), Some("echo ICE:c"));
        server.stop().await;
    }

    #[tokio::test]
    async fn handler_timeout_closes_connection() {
        let config = loopback_config().handler_timeout(Duration::from_millis(50));
        let server = SignalingServer::new(config);
        let (keep_tx, mut keep_rx) = tokio::sync::mpsc::unbounded_channel();
        let addr = server
            .start(move |_, responder| {
                // Hold the responder without ever responding.
                let _ = keep_tx.send(responder);
            })
            .await
            .unwrap();

        let client = SignalingClient::new(PeerAddress::from(addr));
        let result = tokio::time::timeout(Duration::from_secs(2), client.request("OFFER:x"))
            .await
            .expect("server should close after handler timeout");
        assert!(matches!(result, Err(Error::ConnectionClosed)));
        assert!(keep_rx.try_recv().is_ok());
        server.stop().await;
    }
}
