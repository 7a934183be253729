//! Offer/answer handoff between the streaming transport and signaling.
//!
//! The console drives a [`SessionSignaling`] implementation: it sends its
//! offer, gets the display's answer back, and trickles candidates. The
//! display implements [`SessionHandler`] and serves it with
//! [`serve_sessions`].
//!
//! Signaling is one-way. The display answers requests but cannot initiate
//! them, so candidates it gathers after answering are never delivered. A
//! callback registered with
//! [`on_ice_candidate_received`](SessionSignaling::on_ice_candidate_received)
//! is accepted but not called.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::peer::PeerAddress;
use crate::signaling::{SignalingClient, SignalingConfig, SignalingMessage, SignalingServer, ACK};
use crate::Result;

/// Callback for candidates arriving from the remote side.
pub type CandidateCallback = Box<dyn Fn(String) + Send + Sync>;

/// Signaling operations the console's streaming transport relies on.
#[async_trait]
pub trait SessionSignaling: Send + Sync {
    /// Send the local session description; resolves to the remote answer,
    /// or `None` if none arrived.
    async fn send_offer(&self, description: &str) -> Option<String>;

    /// Send a local candidate. Delivery is best effort.
    async fn send_ice_candidate(&self, candidate: &str);

    /// Register a callback for remote candidates.
    fn on_ice_candidate_received(&self, callback: CandidateCallback);
}

/// [`SessionSignaling`] over a [`SignalingClient`].
#[derive(Debug, Clone)]
pub struct SignalingSession {
    client: SignalingClient,
}

impl SignalingSession {
    /// Signal to the display at `peer`.
    pub fn new(peer: PeerAddress) -> Self {
        Self::with_client(SignalingClient::new(peer))
    }

    /// Signal through an existing client.
    pub fn with_client(client: SignalingClient) -> Self {
        Self { client }
    }

    /// Signal with explicit timeouts and limits.
    pub fn with_config(peer: PeerAddress, config: SignalingConfig) -> Self {
        Self::with_client(SignalingClient::with_config(peer, config))
    }

    /// The display this session signals to.
    pub fn peer(&self) -> &PeerAddress {
        self.client.peer()
    }
}

#[async_trait]
impl SessionSignaling for SignalingSession {
    async fn send_offer(&self, description: &str) -> Option<String> {
        let offer = SignalingMessage::Offer(description.to_string());
        let response = self.client.send(&offer.to_string()).await?;
        match SignalingMessage::parse(&response) {
            Some(SignalingMessage::Answer(answer)) => {
                debug!(peer = %self.peer(), "Received answer");
                Some(answer)
            }
            _ => {
                warn!(peer = %self.peer(), "Offer response was not an answer");
                None
            }
        }
    }

    async fn send_ice_candidate(&self, candidate: &str) {
        let ice = SignalingMessage::Ice(candidate.to_string());
        if self.client.send(&ice.to_string()).await.is_none() {
            debug!(peer = %self.peer(), "Candidate not acknowledged");
        }
    }

    fn on_ice_candidate_received(&self, _callback: CandidateCallback) {
        debug!("Remote candidates are not delivered over one-way signaling");
    }
}

/// What the display does with incoming session messages.
#[async_trait]
pub trait SessionHandler: Send + Sync + 'static {
    /// Produce an answer for `description`, or `None` to leave it unanswered.
    async fn on_offer(&self, description: String) -> Option<String>;

    /// Apply a candidate from the console.
    async fn on_ice_candidate(&self, candidate: String);
}

/// Start `server` dispatching session messages to `handler`.
///
/// An offer is answered with `ANSWER:<description>` when the handler
/// produces one; a candidate is acknowledged with `OK` once applied. Other
/// lines get no response.
pub async fn serve_sessions<H: SessionHandler>(
    server: &SignalingServer,
    handler: Arc<H>,
) -> Result<SocketAddr> {
    server
        .start(move |line, responder| {
            let Some(message) = SignalingMessage::parse(&line) else {
                debug!("Ignoring unrecognized signaling message");
                return;
            };
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                match message {
                    SignalingMessage::Offer(description) => {
                        match handler.on_offer(description).await {
                            Some(answer) => {
                                responder.respond(SignalingMessage::Answer(answer).to_string())
                            }
                            None => debug!("Offer left unanswered"),
                        }
                    }
                    SignalingMessage::Ice(candidate) => {
                        handler.on_ice_candidate(candidate).await;
                        responder.respond(ACK);
                    }
                    SignalingMessage::Answer(_) => debug!("Ignoring unsolicited answer"),
                }
            });
        })
        .await
}
