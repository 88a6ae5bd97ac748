//! WebSocket signaling client.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

use super::{SignalingChannel, TransportError};

/// [`SignalingChannel`] over a WebSocket connection. Reader and writer run on
/// their own tasks, bridged to the trait surface through channels.
pub struct WebSocketChannel {
    tx: mpsc::UnboundedSender<String>,
    rx: AsyncMutex<mpsc::UnboundedReceiver<String>>,
    tasks: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl WebSocketChannel {
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let parsed = Url::parse(url)
            .map_err(|err| TransportError::Setup(format!("invalid signaling url {url}: {err}")))?;
        let (ws_stream, _) = connect_async(parsed.as_str())
            .await
            .map_err(|err| TransportError::Setup(format!("websocket connect failed: {err}")))?;
        debug!(url = %parsed, "signaling websocket connected");
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let (tx_out, mut rx_out) = mpsc::unbounded_channel::<String>();
        let (tx_in, rx_in) = mpsc::unbounded_channel::<String>();

        let writer = tokio::spawn(async move {
            while let Some(text) = rx_out.recv().await {
                if ws_write.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(message) = ws_read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if tx_in.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Binary(data)) => {
                        // Some signaling servers relay text as binary frames
                        match String::from_utf8(data) {
                            Ok(text) => {
                                if tx_in.send(text).is_err() {
                                    break;
                                }
                            }
                            Err(_) => {
                                debug!("dropping non-utf8 binary signaling frame");
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "signaling websocket error");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            tx: tx_out,
            rx: AsyncMutex::new(rx_in),
            tasks: Mutex::new(vec![writer, reader]),
        })
    }
}

#[async_trait]
impl SignalingChannel for WebSocketChannel {
    async fn send(&self, text: String) -> Result<(), TransportError> {
        self.tx
            .send(text)
            .map_err(|_| TransportError::ChannelClosed)
    }

    async fn recv(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }

    async fn disconnect(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}
