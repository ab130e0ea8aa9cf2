//! The client facade tying connection, session, and events together.

use std::sync::Arc;

use crate::config::{validate_config, ClientConfig};
use crate::connection::{ConnectionManager, Connector, WsConnector};
use crate::error::{ClientError, Result};
use crate::events::{ErrorEvent, ErrorKind, EventDispatcher};
use crate::protocol::ProtocolCodec;
use crate::session::{
    BatchOutcome, SessionManager, SessionOptions, SessionSnapshot, SessionSummary, SessionTicket,
    SpendingLimitCheck, TipReceipt, TipRequest,
};
use crate::wallet::{LocalWallet, MessageSigner};

/// Session-oriented micropayment channel client.
///
/// One instance owns one connection to the ClearNode and at most one active
/// stream session. Instances are independent, so several clients can coexist
/// in one process.
pub struct TipstreamClient {
    signer: Arc<dyn MessageSigner>,
    events: Arc<EventDispatcher>,
    connection: ConnectionManager,
    session: Arc<SessionManager>,
}

impl std::fmt::Debug for TipstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TipstreamClient")
            .field("address", &self.signer.address())
            .finish_non_exhaustive()
    }
}

impl TipstreamClient {
    /// Build a client from a validated config and an injected signer,
    /// dialing the configured ClearNode URL over WebSocket.
    pub fn new(config: ClientConfig, signer: Arc<dyn MessageSigner>) -> Result<Self> {
        let connector = Arc::new(WsConnector::new(config.clearnode_url.clone()));
        Self::with_connector(config, signer, connector)
    }

    /// Build a client with the wallet key taken from the
    /// `TIPSTREAM_PRIVATE_KEY` environment variable.
    pub fn from_env(config: ClientConfig) -> Result<Self> {
        let wallet = LocalWallet::from_env()?;
        Self::new(config, Arc::new(wallet))
    }

    /// Build a client over an arbitrary transport. This is how tests and
    /// demos run against an in-memory ClearNode.
    pub fn with_connector(
        config: ClientConfig,
        signer: Arc<dyn MessageSigner>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        validate_config(&config).map_err(|errors| {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            ClientError::Config(joined)
        })?;

        let events = Arc::new(EventDispatcher::new());
        let connection =
            ConnectionManager::new(connector, config.reconnect.clone(), events.clone());
        let session = Arc::new(SessionManager::new(
            config,
            ProtocolCodec::new(signer.clone()),
            connection.clone(),
            events.clone(),
        ));
        connection.set_inbound_handler(session.clone());

        Ok(Self {
            signer,
            events,
            connection,
            session,
        })
    }

    /// Connect to the ClearNode. Returns the viewer address on success.
    ///
    /// A failed connect surfaces on the error slot as both a connection
    /// failure and an initialization failure, since nothing works without it.
    pub async fn connect(&self) -> Result<String> {
        if let Err(e) = self.connection.connect().await {
            self.events.emit_error(ErrorEvent {
                kind: ErrorKind::Initialization,
                message: format!("client initialization failed: {}", e),
            });
            return Err(e);
        }
        Ok(self.signer.address())
    }

    /// Close the connection and cancel any pending reconnection.
    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
    }

    /// The viewer address all envelopes are signed under.
    pub fn address(&self) -> String {
        self.signer.address()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Handle for registering event callbacks.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Open a stream session with a streamer. See
    /// [`SessionManager::create_session`].
    pub async fn create_session(
        &self,
        streamer_address: &str,
        deposit_amount: f64,
        options: SessionOptions,
    ) -> Result<SessionTicket> {
        self.session
            .create_session(streamer_address, deposit_amount, options)
            .await
    }

    /// Send an instant, gas-free tip against the active session.
    pub async fn send_tip(
        &self,
        tip_amount: f64,
        streamer_address: &str,
        message: &str,
    ) -> Result<TipReceipt> {
        self.session
            .send_tip(tip_amount, streamer_address, message)
            .await
    }

    /// Send several tips sequentially; per-item failures do not abort the
    /// batch.
    pub async fn send_tip_batch(&self, tips: &[TipRequest]) -> BatchOutcome {
        self.session.send_tip_batch(tips).await
    }

    /// Close the active session and settle the unused balance.
    pub async fn end_session(&self) -> Result<SessionSummary> {
        self.session.end_session().await
    }

    /// Snapshot of the active session, or `None`.
    pub async fn session_info(&self) -> Option<SessionSnapshot> {
        self.session.session_info().await
    }

    /// Advisory spending-limit check; independent of the channel-balance
    /// gate in [`send_tip`](Self::send_tip).
    pub async fn check_spending_limit(
        &self,
        tip_amount: f64,
        spending_limit: f64,
    ) -> SpendingLimitCheck {
        self.session
            .check_spending_limit(tip_amount, spending_limit)
            .await
    }
}
