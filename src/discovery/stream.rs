//! Stream adapter over the discovery callback.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::peer::PeerAddress;

/// Peers found by a discovery session, each reported once.
///
/// Ends after the session is stopped.
#[derive(Debug)]
pub struct PeerStream {
    receiver: UnboundedReceiverStream<PeerAddress>,
}

impl PeerStream {
    /// Create a stream and the sender that feeds it.
    pub(crate) fn new() -> (Self, mpsc::UnboundedSender<PeerAddress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stream = Self {
            receiver: UnboundedReceiverStream::new(rx),
        };
        (stream, tx)
    }
}

impl Stream for PeerStream {
    type Item = PeerAddress;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn yields_sent_peers_then_ends() {
        let (mut stream, tx) = PeerStream::new();
        tx.send(PeerAddress::new("10.0.0.9", 9999)).unwrap();
        drop(tx);

        assert_eq!(stream.next().await, Some(PeerAddress::new("10.0.0.9", 9999)));
        assert_eq!(stream.next().await, None);
    }
}
