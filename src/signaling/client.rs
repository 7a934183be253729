//! Console side of the signaling channel.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::config::SignalingConfig;
use super::line::{check_single_line, read_line, write_line};
use crate::peer::PeerAddress;
use crate::{Error, Result};

/// Sends one-line requests to a display's signaling server.
///
/// Every request opens a fresh connection, writes the line, reads at most one
/// response line and closes.
#[derive(Debug, Clone)]
pub struct SignalingClient {
    peer: PeerAddress,
    config: SignalingConfig,
}

impl SignalingClient {
    /// A client for `peer` with default timeouts.
    pub fn new(peer: PeerAddress) -> Self {
        Self::with_config(peer, SignalingConfig::default())
    }

    /// A client for `peer` with explicit timeouts and limits.
    pub fn with_config(peer: PeerAddress, config: SignalingConfig) -> Self {
        Self { peer, config }
    }

    /// The display this client talks to.
    pub fn peer(&self) -> &PeerAddress {
        &self.peer
    }

    /// Send `message` and return the response, or `None` on any failure.
    ///
    /// A refused connection, a timeout and a server that closes without
    /// answering all look the same to the caller. Failures are logged.
    pub async fn send(&self, message: &str) -> Option<String> {
        match self.request(message).await {
            Ok(response) => Some(response),
            Err(Error::ConnectionClosed) => {
                debug!(peer = %self.peer, "Server closed without responding");
                None
            }
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "Signaling request failed");
                None
            }
        }
    }

    /// Send `message` and wait for the response line.
    pub async fn request(&self, message: &str) -> Result<String> {
        check_single_line(message)?;

        let addr = (self.peer.host(), self.peer.port());
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::timeout("signaling connect", self.config.connect_timeout))??;
        debug!(peer = %self.peer, "Connected for signaling");

        exchange(stream, message, &self.config).await
    }
}

/// Write one line, read one line, close.
pub(crate) async fn exchange<S>(stream: S, message: &str, config: &SignalingConfig) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    write_line(&mut stream, message).await?;

    let response = timeout(config.read_timeout, read_line(&mut stream, config.max_line_len))
        .await
        .map_err(|_| Error::timeout("signaling response", config.read_timeout))??;

    // Best effort: the server closes its side after responding anyway.
    let _ = stream.shutdown().await;
    Ok(response)
}
