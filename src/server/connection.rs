use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;

use crate::protocol::close_codes::CloseCode;
use crate::protocol::{ClientMessage, ServerMessage};

/// Failure modes of a player channel.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The peer closed the channel (or it was already gone).
    #[error("connection closed")]
    Closed,
    /// The underlying socket failed.
    #[error("transport failure: {0}")]
    Transport(#[from] axum::Error),
    /// The peer sent a frame that does not parse into the protocol. The
    /// receive loop must close the channel with [`INVALID_MESSAGE`].
    ///
    /// [`INVALID_MESSAGE`]: crate::protocol::close_codes::INVALID_MESSAGE
    #[error("invalid message: {0}")]
    Invalid(String),
}

/// Per-player bidirectional channel: framed JSON text messages over a
/// WebSocket. The sink and stream halves are independently locked so
/// broadcasts to different players proceed in parallel while sends to one
/// player stay ordered.
#[derive(Debug)]
pub struct Connection {
    sender: Mutex<SplitSink<WebSocket, Message>>,
    receiver: Mutex<SplitStream<WebSocket>>,
    max_message_size: usize,
}

impl Connection {
    pub fn new(socket: WebSocket, max_message_size: usize) -> Self {
        let (sender, receiver) = socket.split();
        Self {
            sender: Mutex::new(sender),
            receiver: Mutex::new(receiver),
            max_message_size,
        }
    }

    /// Serialize and send one message; a failure means the player is gone.
    pub async fn send(&self, message: &ServerMessage) -> Result<(), ConnectionError> {
        let text =
            serde_json::to_string(message).map_err(|err| ConnectionError::Invalid(err.to_string()))?;
        self.send_text(text).await
    }

    /// Send pre-serialized text; used by broadcasts to serialize once.
    pub async fn send_text(&self, text: String) -> Result<(), ConnectionError> {
        let mut sender = self.sender.lock().await;
        sender.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Like [`Connection::send`] but reports failure instead of raising it.
    pub async fn send_silent(&self, message: &ServerMessage) -> bool {
        self.send(message).await.is_ok()
    }

    /// Receive and parse the next protocol message. Ping/pong frames are
    /// handled by the transport and skipped here; binary frames are a
    /// protocol violation.
    pub async fn receive(&self) -> Result<ClientMessage, ConnectionError> {
        let mut receiver = self.receiver.lock().await;
        loop {
            let frame = match receiver.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(err)) => return Err(ConnectionError::Transport(err)),
                None => return Err(ConnectionError::Closed),
            };

            match frame {
                Message::Text(text) => {
                    if text.len() > self.max_message_size {
                        return Err(ConnectionError::Invalid(format!(
                            "message too large ({} bytes, max {})",
                            text.len(),
                            self.max_message_size
                        )));
                    }
                    return serde_json::from_str::<ClientMessage>(&text)
                        .map_err(|err| ConnectionError::Invalid(err.to_string()));
                }
                Message::Binary(_) => {
                    return Err(ConnectionError::Invalid(
                        "binary frames are not part of the protocol".to_string(),
                    ));
                }
                Message::Close(_) => return Err(ConnectionError::Closed),
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    }

    /// Close the channel with an application close code. Errors are dropped;
    /// the peer may already be gone.
    pub async fn close(&self, close_code: CloseCode) {
        let mut sender = self.sender.lock().await;
        let _ = sender
            .send(Message::Close(Some(CloseFrame {
                code: close_code.code,
                reason: close_code.reason.into(),
            })))
            .await;
        let _ = sender.close().await;
    }
}
