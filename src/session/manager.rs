//! Session operations and inbound ClearNode message handling.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, InboundHandler};
use crate::error::{ClientError, Result};
use crate::events::{
    BalanceUpdateEvent, ErrorEvent, ErrorKind, EventDispatcher, SessionClosedEvent,
    SessionCreatedEvent, TipReceivedEvent, TipSentEvent,
};
use crate::observability::metrics;
use crate::protocol::codec::epoch_millis;
use crate::protocol::types::{
    Allocation, AppDefinition, BalanceUpdateMsg, IncomingTip, InboundMessage, SessionCreatedMsg,
    SessionMetadata, SessionProposal, TipPayload,
};
use crate::protocol::ProtocolCodec;
use crate::session::limits::{self, SpendingLimitCheck};
use crate::session::state::{
    generate_session_id, SessionSnapshot, SessionStatus, SessionSummary, SessionTicket,
    StreamSession, TipReceipt,
};
use crate::units::{commission_split, from_units, to_units};

/// Protocol identifier stamped into every channel definition.
const SESSION_PROTOCOL: &str = "tipstream-v1";

/// Options for opening a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Applies the partner commission rate instead of the standard one.
    pub is_partner: bool,
    /// Challenge period in seconds; 0 for instant finality.
    pub challenge_period: u64,
}

/// One entry of a tip batch.
#[derive(Debug, Clone)]
pub struct TipRequest {
    pub amount: f64,
    pub streamer_address: String,
    pub message: Option<String>,
}

/// Aggregate result of a tip batch.
///
/// `total_amount` sums every *attempted* tip, failed ones included.
#[derive(Debug)]
pub struct BatchOutcome {
    pub total_tips: usize,
    pub successful_tips: usize,
    pub total_amount: f64,
    pub results: Vec<std::result::Result<TipReceipt, String>>,
}

/// Owns the single active stream session and every operation against it.
///
/// All operations lock the ledger for their full duration, so admission
/// checks, signing, transmission and the optimistic debit never interleave
/// between two concurrent calls. Events, success and failure alike, fire
/// after the lock is released, so a handler may call back into the client.
pub struct SessionManager {
    config: ClientConfig,
    codec: ProtocolCodec,
    connection: ConnectionManager,
    events: Arc<EventDispatcher>,
    ledger: tokio::sync::Mutex<Option<StreamSession>>,
}

impl SessionManager {
    pub fn new(
        config: ClientConfig,
        codec: ProtocolCodec,
        connection: ConnectionManager,
        events: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            config,
            codec,
            connection,
            events,
            ledger: tokio::sync::Mutex::new(None),
        }
    }

    /// Open a stream session with a streamer.
    ///
    /// Transmits the signed session-open envelope and records the session
    /// locally in `pending` status; it stays pending until the ClearNode's
    /// `session_created` confirmation arrives.
    pub async fn create_session(
        &self,
        streamer_address: &str,
        deposit_amount: f64,
        options: SessionOptions,
    ) -> Result<SessionTicket> {
        self.open_session(streamer_address, deposit_amount, options)
            .await
            .map_err(|e| self.report(ErrorKind::SessionCreation, e))
    }

    /// The locked half of [`create_session`](Self::create_session); the
    /// ledger guard drops on return, before anything is reported.
    async fn open_session(
        &self,
        streamer_address: &str,
        deposit_amount: f64,
        options: SessionOptions,
    ) -> Result<SessionTicket> {
        let mut ledger = self.ledger.lock().await;

        if !self.connection.is_connected() {
            return Err(ClientError::InvalidState(
                "not connected to clearnode".into(),
            ));
        }
        if streamer_address.is_empty() {
            return Err(ClientError::Validation(
                "streamer address is required".into(),
            ));
        }
        if deposit_amount <= 0.0 {
            return Err(ClientError::Validation(format!(
                "deposit amount must be greater than 0, got {}",
                deposit_amount
            )));
        }
        if let Some(existing) = ledger.as_ref() {
            return Err(ClientError::InvalidState(format!(
                "a session is already {} ({})",
                existing.status, existing.session_id
            )));
        }

        let viewer = self.codec.sender();
        let commission_rate = if options.is_partner {
            self.config.partner_commission
        } else {
            self.config.standard_commission
        };
        let deposit_units = to_units(deposit_amount, self.config.asset_decimals);
        let now = epoch_millis();

        let app_definition = AppDefinition {
            protocol: SESSION_PROTOCOL.to_string(),
            participants: [viewer.clone(), streamer_address.to_string()],
            weights: [50, 50],
            quorum: 100,
            challenge: options.challenge_period,
            nonce: now,
            metadata: SessionMetadata {
                session_type: "streaming".to_string(),
                commission_rate,
                is_partner: options.is_partner,
                streamer_id: streamer_address.to_string(),
                viewer_id: viewer.clone(),
                timestamp: Utc::now().to_rfc3339(),
            },
        };
        let allocations = vec![
            Allocation {
                participant: viewer.clone(),
                asset: self.config.default_asset.clone(),
                amount: deposit_units.to_string(),
            },
            Allocation {
                participant: streamer_address.to_string(),
                asset: self.config.default_asset.clone(),
                amount: "0".to_string(),
            },
        ];

        let proposal = SessionProposal {
            definition: app_definition.clone(),
            allocations: allocations.clone(),
        };
        let frame = self
            .codec
            .session_open_envelope(std::slice::from_ref(&proposal))
            .await?;
        self.connection.send(frame).await?;

        let session = StreamSession {
            session_id: generate_session_id(),
            remote_session_id: None,
            viewer_address: viewer,
            streamer_address: streamer_address.to_string(),
            initial_deposit: deposit_amount,
            current_balance: deposit_amount,
            spent: 0.0,
            commission_rate,
            is_partner: options.is_partner,
            status: SessionStatus::Pending,
            created_at: now,
            closed_at: None,
            app_definition,
            allocations,
        };
        let ticket = SessionTicket {
            session_id: session.session_id.clone(),
            deposit: deposit_amount,
            commission_rate,
        };

        tracing::info!(
            session_id = %session.session_id,
            streamer = %session.streamer_address,
            deposit = deposit_amount,
            commission_rate,
            "stream session opened, awaiting confirmation"
        );
        metrics::record_session_opened();
        *ledger = Some(session);

        Ok(ticket)
    }

    /// Send a signed tip against the active session.
    ///
    /// The local ledger is debited optimistically once the envelope has been
    /// transmitted; a later authoritative `balance_update` may overwrite the
    /// balance.
    pub async fn send_tip(
        &self,
        tip_amount: f64,
        streamer_address: &str,
        message: &str,
    ) -> Result<TipReceipt> {
        match self.transmit_tip(tip_amount, streamer_address, message).await {
            Ok((receipt, event)) => {
                tracing::info!(
                    amount = tip_amount,
                    recipient = %event.recipient,
                    remaining = event.remaining_balance,
                    "tip sent"
                );
                metrics::record_tip_sent();
                self.events.emit_tip_sent(event);
                Ok(receipt)
            }
            Err(e) => Err(self.report(ErrorKind::Tip, e)),
        }
    }

    /// The locked half of [`send_tip`](Self::send_tip): admission checks,
    /// signing, transmission and the optimistic debit under one guard.
    async fn transmit_tip(
        &self,
        tip_amount: f64,
        streamer_address: &str,
        message: &str,
    ) -> Result<(TipReceipt, TipSentEvent)> {
        let mut ledger = self.ledger.lock().await;

        let session = ledger.as_mut().ok_or(ClientError::NoActiveSession)?;
        if session.streamer_address != streamer_address {
            return Err(ClientError::WrongCounterparty {
                expected: session.streamer_address.clone(),
                got: streamer_address.to_string(),
            });
        }
        if tip_amount <= 0.0 {
            return Err(ClientError::InvalidAmount(tip_amount));
        }
        if tip_amount > session.current_balance {
            return Err(ClientError::InsufficientBalance {
                requested: tip_amount,
                available: session.current_balance,
            });
        }

        let decimals = self.config.asset_decimals;
        let split = commission_split(tip_amount, session.commission_rate);
        let amount_units = to_units(tip_amount, decimals);
        let payload = TipPayload {
            kind: "tip",
            session_id: session.session_id.clone(),
            amount: amount_units.to_string(),
            recipient: streamer_address.to_string(),
            sender: session.viewer_address.clone(),
            message: message.to_string(),
            timestamp: epoch_millis(),
            commission: to_units(split.commission, decimals).to_string(),
            creator_receives: to_units(split.creator_receives, decimals).to_string(),
        };

        let frame = self.codec.tip_envelope(payload).await?;
        self.connection.send(frame).await?;

        session.record_tip(tip_amount);
        let receipt = TipReceipt {
            amount: tip_amount,
            commission: split.commission,
            creator_receives: split.creator_receives,
            remaining_balance: session.current_balance,
            total_spent: session.spent,
        };
        let event = TipSentEvent {
            amount: tip_amount,
            amount_units,
            recipient: streamer_address.to_string(),
            message: message.to_string(),
            commission: split.commission,
            creator_receives: split.creator_receives,
            remaining_balance: session.current_balance,
            total_spent: session.spent,
        };

        Ok((receipt, event))
    }

    /// Send several tips sequentially.
    ///
    /// A failed item is recorded and the batch continues.
    pub async fn send_tip_batch(&self, tips: &[TipRequest]) -> BatchOutcome {
        let mut results = Vec::with_capacity(tips.len());
        let mut successful = 0usize;
        let mut total_amount = 0.0;

        for tip in tips {
            total_amount += tip.amount;
            match self
                .send_tip(
                    tip.amount,
                    &tip.streamer_address,
                    tip.message.as_deref().unwrap_or(""),
                )
                .await
            {
                Ok(receipt) => {
                    successful += 1;
                    results.push(Ok(receipt));
                }
                Err(e) => results.push(Err(e.to_string())),
            }
        }

        BatchOutcome {
            total_tips: tips.len(),
            successful_tips: successful,
            total_amount,
            results,
        }
    }

    /// Close the active session and settle the remaining balance.
    pub async fn end_session(&self) -> Result<SessionSummary> {
        match self.settle_session().await {
            Ok(summary) => {
                tracing::info!(
                    session_id = %summary.session_id,
                    total_spent = summary.total_spent,
                    unused_balance = summary.unused_balance,
                    "stream session ended"
                );
                metrics::record_session_closed();
                self.events
                    .emit_session_closed(SessionClosedEvent::Settled(summary.clone()));
                Ok(summary)
            }
            Err(e) => Err(self.report(ErrorKind::SessionClose, e)),
        }
    }

    /// The locked half of [`end_session`](Self::end_session): transmit the
    /// signed close, then detach the ledger.
    async fn settle_session(&self) -> Result<SessionSummary> {
        let mut ledger = self.ledger.lock().await;

        let session = ledger.as_mut().ok_or(ClientError::NoActiveSession)?;
        let frame = self.codec.close_envelope(&session.session_id).await?;
        self.connection.send(frame).await?;

        let summary = session.close(epoch_millis());
        *ledger = None;
        Ok(summary)
    }

    /// Snapshot of the active session, if any.
    pub async fn session_info(&self) -> Option<SessionSnapshot> {
        self.ledger.lock().await.as_ref().map(|s| s.snapshot())
    }

    /// Evaluate a prospective tip against a caller-supplied spending
    /// ceiling. Advisory only; independent of the channel-balance check in
    /// [`send_tip`](Self::send_tip).
    pub async fn check_spending_limit(
        &self,
        tip_amount: f64,
        spending_limit: f64,
    ) -> SpendingLimitCheck {
        match self.ledger.lock().await.as_ref() {
            Some(session) => limits::evaluate(session.spent, tip_amount, spending_limit),
            None => limits::no_active_session(spending_limit),
        }
    }

    /// Broadcast a failure on the error slot, then hand it back to the
    /// caller. Signing failures keep their own tag regardless of operation.
    fn report(&self, kind: ErrorKind, err: ClientError) -> ClientError {
        let kind = if matches!(err, ClientError::Signing(_)) {
            ErrorKind::Signing
        } else {
            kind
        };
        self.events.emit_error(ErrorEvent {
            kind,
            message: err.to_string(),
        });
        err
    }

    async fn on_session_created(&self, msg: SessionCreatedMsg) {
        let mut ledger = self.ledger.lock().await;
        let mut snapshot = None;
        if let Some(session) = ledger.as_mut() {
            if session.status == SessionStatus::Pending {
                session.status = SessionStatus::Active;
                session.remote_session_id = msg.session_id.clone();
                tracing::info!(
                    session_id = %session.session_id,
                    remote_session_id = msg.session_id.as_deref().unwrap_or(""),
                    "session confirmed by clearnode"
                );
            }
            snapshot = Some(session.snapshot());
        }
        drop(ledger);

        self.events.emit_session_created(SessionCreatedEvent {
            remote_session_id: msg.session_id,
            session: snapshot,
        });
    }

    /// Incoming tip: this client is the payee. Never touches the viewer-side
    /// session ledger.
    fn on_tip_received(&self, tip: IncomingTip) {
        let decimals = self.config.asset_decimals;
        let amount = from_units(tip.amount, decimals);
        let commission = from_units(tip.commission.unwrap_or(0), decimals);
        let creator_receives = amount - commission;

        tracing::info!(amount, creator_receives, "tip received");
        self.events.emit_tip_received(TipReceivedEvent {
            amount,
            commission,
            creator_receives,
            sender: tip.sender,
            message: tip.message,
            timestamp: tip.timestamp,
        });
    }

    /// Authoritative balance from the ClearNode overwrites the optimistic
    /// local value; a divergence is logged, last write wins.
    async fn on_balance_update(&self, msg: BalanceUpdateMsg) {
        let balance = from_units(msg.balance, self.config.asset_decimals);
        let mut ledger = self.ledger.lock().await;
        if let Some(session) = ledger.as_mut() {
            if (session.current_balance - balance).abs() > 1e-9 {
                tracing::warn!(
                    optimistic = session.current_balance,
                    authoritative = balance,
                    session_id = %session.session_id,
                    "local balance diverged from clearnode, overwriting"
                );
            }
            session.current_balance = balance;
        }
        drop(ledger);

        self.events
            .emit_balance_update(BalanceUpdateEvent { balance });
    }
}

#[async_trait]
impl InboundHandler for SessionManager {
    async fn handle_inbound(&self, raw: &str) {
        let message = match ProtocolCodec::parse_inbound(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "malformed clearnode frame dropped");
                return;
            }
        };
        metrics::record_inbound_message(message.tag());

        match message {
            InboundMessage::SessionCreated(msg) => self.on_session_created(msg).await,
            InboundMessage::Tip(tip) => self.on_tip_received(tip),
            InboundMessage::BalanceUpdate(msg) => self.on_balance_update(msg).await,
            InboundMessage::SessionClosed(fields) => {
                tracing::info!("session closed on clearnode");
                self.events
                    .emit_session_closed(SessionClosedEvent::Remote(fields));
            }
            InboundMessage::Error(msg) => {
                tracing::warn!(error = %msg.error, "clearnode reported an error");
                self.events.emit_error(ErrorEvent {
                    kind: ErrorKind::Clearnode,
                    message: msg.error,
                });
            }
            InboundMessage::Unknown => {
                tracing::debug!(frame = raw, "unknown clearnode message ignored");
            }
        }
    }
}
