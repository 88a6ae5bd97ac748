//! In-memory signaling channel pair.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc};

use super::{SignalingChannel, TransportError};

/// One end of an in-memory signaling link. Frames sent on one end arrive, in
/// order, at the other.
pub struct LocalChannel {
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    rx: AsyncMutex<mpsc::UnboundedReceiver<String>>,
}

impl LocalChannel {
    /// Create a pair of connected channel ends.
    pub fn create_pair() -> (LocalChannel, LocalChannel) {
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        (
            LocalChannel {
                tx: Mutex::new(Some(tx2)),
                rx: AsyncMutex::new(rx1),
            },
            LocalChannel {
                tx: Mutex::new(Some(tx1)),
                rx: AsyncMutex::new(rx2),
            },
        )
    }
}

#[async_trait]
impl SignalingChannel for LocalChannel {
    async fn send(&self, text: String) -> Result<(), TransportError> {
        let guard = self.tx.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => tx.send(text).map_err(|_| TransportError::ChannelClosed),
            None => Err(TransportError::ChannelClosed),
        }
    }

    async fn recv(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }

    async fn disconnect(&self) {
        self.tx.lock().unwrap().take();
    }
}
