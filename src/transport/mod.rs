//! Signaling channel seam.
//!
//! The core exchanges opaque text frames with the remote peer through this
//! trait. [`websocket::WebSocketChannel`] is the production client;
//! [`local::LocalChannel`] is an in-memory pair for tests and same-process
//! wiring.

use async_trait::async_trait;

pub mod local;
pub mod websocket;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("signaling setup failed: {0}")]
    Setup(String),
    #[error("signaling channel closed")]
    ChannelClosed,
}

/// Duplex text transport for signaling frames.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Send a text frame to the remote peer. Best effort; a failure never
    /// retries.
    async fn send(&self, text: String) -> Result<(), TransportError>;

    /// Receive the next inbound text frame. `None` means the channel closed.
    async fn recv(&self) -> Option<String>;

    /// Tear the channel down. Subsequent sends fail with
    /// [`TransportError::ChannelClosed`].
    async fn disconnect(&self);
}
