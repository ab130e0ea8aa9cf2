//! Connection lifecycle: connect, send, read pump, bounded reconnection.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::config::ReconnectConfig;
use crate::connection::backoff::reconnect_delay;
use crate::connection::transport::{Connector, TransportSink, TransportStream};
use crate::error::{ClientError, Result};
use crate::events::{ErrorEvent, ErrorKind, EventDispatcher};
use crate::observability::metrics;

/// Receives raw inbound frames from the read pump, in arrival order.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle_inbound(&self, raw: &str);
}

/// Owns the transport to the ClearNode.
///
/// Lifecycle: disconnected → connecting → connected, and on a transport
/// drop back through disconnected into a bounded reconnect loop. An
/// intentional [`disconnect`](ConnectionManager::disconnect) cancels any
/// pending reconnection; once the attempt cap is exhausted the loop stops
/// permanently and the caller must connect again explicitly.
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    connector: Arc<dyn Connector>,
    reconnect: ReconnectConfig,
    events: Arc<EventDispatcher>,
    connected: AtomicBool,
    reconnect_attempts: AtomicU32,
    /// Set by a local `disconnect()`; suppresses reconnection.
    closing: AtomicBool,
    sink: tokio::sync::Mutex<Option<Box<dyn TransportSink>>>,
    inbound: std::sync::Mutex<Option<Arc<dyn InboundHandler>>>,
    pump_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    reconnect_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        reconnect: ReconnectConfig,
        events: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                connector,
                reconnect,
                events,
                connected: AtomicBool::new(false),
                reconnect_attempts: AtomicU32::new(0),
                closing: AtomicBool::new(false),
                sink: tokio::sync::Mutex::new(None),
                inbound: std::sync::Mutex::new(None),
                pump_task: std::sync::Mutex::new(None),
                reconnect_task: std::sync::Mutex::new(None),
            }),
        }
    }

    /// Register the handler the read pump delivers frames to.
    pub fn set_inbound_handler(&self, handler: Arc<dyn InboundHandler>) {
        *self.shared.inbound.lock().unwrap() = Some(handler);
    }

    /// Dial the ClearNode.
    ///
    /// Resolves once the transport is open: the sink is stored, the read
    /// pump is running, the attempt counter is reset and `Connected` has
    /// fired. A dial failure fires a `connection_error` event and rejects.
    pub async fn connect(&self) -> Result<()> {
        self.shared.closing.store(false, Ordering::SeqCst);
        connect_shared(&self.shared).await
    }

    /// Transmit one text frame.
    ///
    /// Fails immediately when not connected; nothing is queued or retried.
    pub async fn send(&self, text: String) -> Result<()> {
        if !self.is_connected() {
            return Err(ClientError::Transport(
                "not connected to clearnode".into(),
            ));
        }
        let mut sink = self.shared.sink.lock().await;
        match sink.as_mut() {
            Some(sink) => sink.send(text).await,
            None => Err(ClientError::Transport(
                "not connected to clearnode".into(),
            )),
        }
    }

    /// Close the connection locally and cancel any pending reconnection.
    pub async fn disconnect(&self) {
        self.shared.closing.store(true, Ordering::SeqCst);
        if let Some(task) = self.shared.reconnect_task.lock().unwrap().take() {
            task.abort();
        }
        if let Some(task) = self.shared.pump_task.lock().unwrap().take() {
            task.abort();
        }
        if let Some(mut sink) = self.shared.sink.lock().await.take() {
            let _ = sink.close().await;
        }
        if self.shared.connected.swap(false, Ordering::SeqCst) {
            tracing::info!("disconnected from clearnode (local close)");
            self.shared.events.emit_disconnected();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Reconnect attempts since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.reconnect_attempts.load(Ordering::SeqCst)
    }
}

async fn connect_shared(shared: &Arc<Shared>) -> Result<()> {
    match shared.connector.connect().await {
        Ok((sink, stream)) => {
            *shared.sink.lock().await = Some(sink);
            shared.connected.store(true, Ordering::SeqCst);
            shared.reconnect_attempts.store(0, Ordering::SeqCst);
            spawn_pump(shared, stream);
            tracing::info!("connected to clearnode");
            metrics::record_connected();
            shared.events.emit_connected();
            Ok(())
        }
        Err(e) => {
            tracing::warn!(error = %e, "clearnode dial failed");
            shared.events.emit_error(ErrorEvent {
                kind: ErrorKind::Connection,
                message: format!("failed to connect to clearnode: {}", e),
            });
            Err(e)
        }
    }
}

fn spawn_pump(shared: &Arc<Shared>, mut stream: Box<dyn TransportStream>) {
    let shared_task = Arc::clone(shared);
    let handle = tokio::spawn(async move {
        loop {
            match stream.next_frame().await {
                Some(Ok(raw)) => {
                    let handler = shared_task.inbound.lock().unwrap().clone();
                    match handler {
                        Some(handler) => handler.handle_inbound(&raw).await,
                        None => {
                            tracing::debug!("inbound frame before handler registration, dropped")
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "transport read error");
                    break;
                }
                None => break,
            }
        }
        handle_closed(&shared_task).await;
    });
    if let Some(old) = shared.pump_task.lock().unwrap().replace(handle) {
        old.abort();
    }
}

/// Transport closed underneath us: fire `Disconnected`, then reconnect
/// unless the close was locally requested.
async fn handle_closed(shared: &Arc<Shared>) {
    shared.connected.store(false, Ordering::SeqCst);
    shared.sink.lock().await.take();
    tracing::info!("disconnected from clearnode");
    shared.events.emit_disconnected();
    if !shared.closing.load(Ordering::SeqCst) {
        spawn_reconnect(shared);
    }
}

fn spawn_reconnect(shared: &Arc<Shared>) {
    let shared_task = Arc::clone(shared);
    let handle = tokio::spawn(async move {
        loop {
            let attempt = shared_task.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let max = shared_task.reconnect.max_attempts;
            if attempt > max {
                tracing::error!(attempts = max, "max reconnection attempts reached");
                shared_task.events.emit_error(ErrorEvent {
                    kind: ErrorKind::MaxReconnectAttempts,
                    message: "could not reconnect to clearnode".into(),
                });
                return;
            }

            let delay = reconnect_delay(
                attempt,
                shared_task.reconnect.base_delay_ms,
                shared_task.reconnect.max_delay_ms,
            );
            tracing::info!(
                attempt,
                max,
                delay_ms = delay.as_millis() as u64,
                "scheduling reconnect"
            );
            metrics::record_reconnect_attempt();
            tokio::time::sleep(delay).await;

            match connect_shared(&shared_task).await {
                Ok(()) => return,
                Err(e) => tracing::warn!(attempt, error = %e, "reconnect failed"),
            }
        }
    });
    if let Some(old) = shared.reconnect_task.lock().unwrap().replace(handle) {
        old.abort();
    }
}
