//! The WebSocket transport capability (spec §4.5 "Connecting"/"Joined").

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use relaycore_core::Envelope;
use tokio_tungstenite::tungstenite::Message;

use crate::error::CloudError;

/// Opens connections to the cloud relay.
#[async_trait]
pub trait CloudTransport: Send + Sync {
    /// Open a socket at `url`. Joining `group` is a separate step
    /// ([`CloudSession::rejoin`]) performed by the caller, so a socket-open
    /// failure and a group-join failure are distinguishable (spec §4.5:
    /// a failed rejoin retries on the same socket, a failed connect does
    /// not).
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::Transport`] if the socket cannot be opened.
    async fn connect(&self, url: &str, group: &str) -> Result<Box<dyn CloudSession>, CloudError>;
}

/// A single open connection to the relay, joined to one group.
#[async_trait]
pub trait CloudSession: Send {
    /// Publish an envelope to the joined group.
    async fn send(&mut self, envelope: &Envelope) -> Result<(), CloudError>;

    /// Receive the next inbound envelope. Returns `Ok(None)` when the
    /// connection closes cleanly.
    async fn recv(&mut self) -> Result<Option<Envelope>, CloudError>;

    /// Rejoin `group` on the existing socket (spec §4.5: "if a rejoin of a
    /// specific group fails, waits 3s and rejoins that group only").
    async fn rejoin(&mut self, group: &str) -> Result<(), CloudError>;

    /// Close the connection.
    async fn close(&mut self);
}

/// Production transport backed by `tokio-tungstenite`.
#[derive(Default)]
pub struct WebSocketTransport;

#[async_trait]
impl CloudTransport for WebSocketTransport {
    async fn connect(&self, url: &str, _group: &str) -> Result<Box<dyn CloudSession>, CloudError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        Ok(Box::new(WebSocketSession { stream }))
    }
}

struct WebSocketSession {
    stream: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
}

#[async_trait]
impl CloudSession for WebSocketSession {
    async fn send(&mut self, envelope: &Envelope) -> Result<(), CloudError> {
        let text = serde_json::to_string(envelope).map_err(CloudError::Encode)?;
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<Envelope>, CloudError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    let envelope: Envelope = serde_json::from_str(&text).map_err(CloudError::Encode)?;
                    return Ok(Some(envelope));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_other)) => continue, // ping/pong/binary frames carry no envelope
                Some(Err(e)) => return Err(CloudError::Transport(e.to_string())),
            }
        }
    }

    async fn rejoin(&mut self, group: &str) -> Result<(), CloudError> {
        let text = serde_json::json!({ "op": "join", "group": group }).to_string();
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| CloudError::JoinFailed {
                group: group.to_string(),
                reason: e.to_string(),
            })
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
