//! Transport abstraction over the ClearNode connection.
//!
//! Production dials a WebSocket; tests and demos plug in the in-memory
//! implementation from [`memory`]. Either way the connection manager only
//! sees a pair of boxed sink/stream halves exchanging text frames.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{ClientError, Result};

/// Outbound half of a connection.
#[async_trait]
pub trait TransportSink: Send {
    /// Transmit one text frame.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Close the connection from this side.
    async fn close(&mut self) -> Result<()>;
}

/// Inbound half of a connection.
#[async_trait]
pub trait TransportStream: Send {
    /// Next inbound text frame; `None` once the connection is gone.
    async fn next_frame(&mut self) -> Option<Result<String>>;
}

/// Dials the ClearNode and yields a fresh connection.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<(Box<dyn TransportSink>, Box<dyn TransportStream>)>;
}

/// Production connector: WebSocket client toward a configured endpoint URL.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<(Box<dyn TransportSink>, Box<dyn TransportStream>)> {
        tracing::debug!(url = %self.url, "dialing clearnode");
        let (ws, _response) = connect_async(self.url.as_str())
            .await
            .map_err(ClientError::transport)?;
        let (sink, stream) = ws.split();
        Ok((Box::new(WsSink(sink)), Box::new(WsStream(stream))))
    }
}

struct WsSink(SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>);

#[async_trait]
impl TransportSink for WsSink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.0
            .send(Message::Text(text.into()))
            .await
            .map_err(ClientError::transport)
    }

    async fn close(&mut self) -> Result<()> {
        self.0.close().await.map_err(ClientError::transport)
    }
}

struct WsStream(SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>);

#[async_trait]
impl TransportStream for WsStream {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        loop {
            match self.0.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text.to_string())),
                Some(Ok(Message::Close(_))) | None => return None,
                // Control and binary frames carry no protocol messages.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Some(Err(ClientError::transport(e))),
            }
        }
    }
}

/// In-memory duplex transport for tests and demos.
///
/// Each successful dial creates a fresh channel pair and hands the remote
/// half to whoever holds the peer receiver. Dropping a [`memory::RemotePeer`]
/// severs the connection the way a network drop would.
pub mod memory {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// The ClearNode half of an in-memory connection.
    pub struct RemotePeer {
        /// Frames the client transmitted.
        pub outbound: mpsc::UnboundedReceiver<String>,
        /// Sender for frames delivered to the client.
        pub inbound: mpsc::UnboundedSender<String>,
    }

    impl RemotePeer {
        /// Deliver a raw frame to the client.
        pub fn deliver(&self, raw: impl Into<String>) {
            let _ = self.inbound.send(raw.into());
        }
    }

    /// Connector yielding in-memory connections, with scriptable dial
    /// failures for reconnect tests.
    pub struct MemoryConnector {
        attempts: AtomicU32,
        failures_remaining: AtomicU32,
        peers: mpsc::UnboundedSender<RemotePeer>,
    }

    impl MemoryConnector {
        /// Create a connector plus the receiver on which each new remote
        /// peer half arrives.
        pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<RemotePeer>) {
            let (peers, peers_rx) = mpsc::unbounded_channel();
            (
                Arc::new(Self {
                    attempts: AtomicU32::new(0),
                    failures_remaining: AtomicU32::new(0),
                    peers,
                }),
                peers_rx,
            )
        }

        /// Make the next `n` dial attempts fail.
        pub fn fail_next(&self, n: u32) {
            self.failures_remaining.store(n, Ordering::SeqCst);
        }

        /// Total dial attempts so far, failed ones included.
        pub fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for MemoryConnector {
        async fn connect(&self) -> Result<(Box<dyn TransportSink>, Box<dyn TransportStream>)> {
            self.attempts.fetch_add(1, Ordering::SeqCst);

            let should_fail = self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if should_fail {
                return Err(ClientError::Transport("simulated dial failure".into()));
            }

            let (client_tx, remote_rx) = mpsc::unbounded_channel();
            let (remote_tx, client_rx) = mpsc::unbounded_channel();
            let _ = self.peers.send(RemotePeer {
                outbound: remote_rx,
                inbound: remote_tx,
            });
            Ok((
                Box::new(MemorySink(Some(client_tx))),
                Box::new(MemoryStream(client_rx)),
            ))
        }
    }

    struct MemorySink(Option<mpsc::UnboundedSender<String>>);

    #[async_trait]
    impl TransportSink for MemorySink {
        async fn send(&mut self, text: String) -> Result<()> {
            match &self.0 {
                Some(tx) => tx
                    .send(text)
                    .map_err(|_| ClientError::Transport("peer went away".into())),
                None => Err(ClientError::Transport("connection closed".into())),
            }
        }

        async fn close(&mut self) -> Result<()> {
            self.0.take();
            Ok(())
        }
    }

    struct MemoryStream(mpsc::UnboundedReceiver<String>);

    #[async_trait]
    impl TransportStream for MemoryStream {
        async fn next_frame(&mut self) -> Option<Result<String>> {
            self.0.recv().await.map(Ok)
        }
    }
}
