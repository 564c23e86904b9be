//! Channel binding: one bidirectional streaming connection
//!
//! The session core only depends on the [`Channel`] trait; the
//! production [`WebSocketChannel`] speaks JSON frames over a WebSocket.
//! Reconnection policy and backoff belong to whatever sits behind the
//! trait, not to this crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use motorchat_api::wire::{ClientEvent, ServerEvent};

use crate::error::{Error, Result};

/// Events observed on the channel: connection lifecycle plus decoded
/// server events.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Connected,
    Disconnected { reason: Option<String> },
    Server(ServerEvent),
}

/// One live streaming connection to the chat backend
#[async_trait]
pub trait Channel: Send + Sync {
    /// Establish the connection using the given bearer credential.
    /// At most one live connection; a prior one is torn down first.
    async fn connect(&self, credential: &str) -> Result<()>;

    /// Close the connection. Idempotent.
    async fn disconnect(&self);

    /// Emit an outbound event. Fails when disconnected.
    async fn send(&self, event: ClientEvent) -> Result<()>;

    /// Subscribe to inbound channel events
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent>;

    fn is_connected(&self) -> bool;
}

struct LiveConnection {
    outbound_tx: mpsc::UnboundedSender<ClientEvent>,
    cancel: CancellationToken,
}

/// WebSocket-backed [`Channel`] implementation
pub struct WebSocketChannel {
    url: String,
    event_tx: broadcast::Sender<ChannelEvent>,
    connected: Arc<AtomicBool>,
    live: Mutex<Option<LiveConnection>>,
}

impl WebSocketChannel {
    /// Create a channel for the given WebSocket endpoint
    /// (e.g. `ws://localhost:3001/chat`).
    pub fn new(url: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            url: url.into(),
            event_tx,
            connected: Arc::new(AtomicBool::new(false)),
            live: Mutex::new(None),
        }
    }

    fn teardown(&self) {
        if let Some(live) = self.live.lock().take() {
            live.cancel.cancel();
        }
        self.connected.store(false, Ordering::Release);
    }
}

#[async_trait]
impl Channel for WebSocketChannel {
    async fn connect(&self, credential: &str) -> Result<()> {
        self.teardown();

        let url = format!("{}?token={}", self.url, credential);
        let (stream, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| {
                let _ = self.event_tx.send(ChannelEvent::Disconnected {
                    reason: Some(e.to_string()),
                });
                Error::Channel(e.to_string())
            })?;

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let cancel = CancellationToken::new();

        *self.live.lock() = Some(LiveConnection {
            outbound_tx,
            cancel: cancel.clone(),
        });
        self.connected.store(true, Ordering::Release);
        let _ = self.event_tx.send(ChannelEvent::Connected);

        let event_tx = self.event_tx.clone();
        let connected = Arc::clone(&self.connected);
        tokio::spawn(async move {
            let reason = loop {
                tokio::select! {
                    _ = cancel.cancelled() => break None,
                    outbound = outbound_rx.recv() => {
                        let Some(event) = outbound else { break None };
                        match serde_json::to_string(&event) {
                            Ok(frame) => {
                                if let Err(e) = sink.send(WsMessage::Text(frame.into())).await {
                                    break Some(e.to_string());
                                }
                            }
                            Err(e) => tracing::error!("failed to encode outbound event: {}", e),
                        }
                    }
                    inbound = source.next() => {
                        match inbound {
                            Some(Ok(WsMessage::Text(frame))) => {
                                match serde_json::from_str::<ServerEvent>(&frame) {
                                    Ok(event) => {
                                        let _ = event_tx.send(ChannelEvent::Server(event));
                                    }
                                    Err(e) => {
                                        tracing::debug!("dropping undecodable frame: {}", e);
                                    }
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => break None,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => break Some(e.to_string()),
                        }
                    }
                }
            };

            connected.store(false, Ordering::Release);
            let _ = event_tx.send(ChannelEvent::Disconnected { reason });
        });

        Ok(())
    }

    async fn disconnect(&self) {
        self.teardown();
    }

    async fn send(&self, event: ClientEvent) -> Result<()> {
        let guard = self.live.lock();
        let live = guard.as_ref().filter(|_| self.is_connected());
        match live {
            Some(live) => live
                .outbound_tx
                .send(event)
                .map_err(|_| Error::Disconnected),
            None => Err(Error::Disconnected),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.event_tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}
