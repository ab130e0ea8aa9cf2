//! Event payloads delivered to registered handlers.

use serde::Serialize;

use crate::session::state::{SessionSnapshot, SessionSummary};

/// Fired when the ClearNode confirms a session it was asked to open.
#[derive(Debug, Clone, Serialize)]
pub struct SessionCreatedEvent {
    /// Session id assigned by the ClearNode, when it sent one.
    pub remote_session_id: Option<String>,
    /// Snapshot of the now-active local session.
    pub session: Option<SessionSnapshot>,
}

/// Fired after a tip has been transmitted and applied to the local ledger.
#[derive(Debug, Clone, Serialize)]
pub struct TipSentEvent {
    /// Tip amount in decimal currency units.
    pub amount: f64,
    /// Tip amount in integer asset units, as it went over the wire.
    pub amount_units: u64,
    /// Streamer address the tip went to.
    pub recipient: String,
    /// Free-form message attached to the tip.
    pub message: String,
    /// Platform commission, decimal.
    pub commission: f64,
    /// Creator payout, decimal.
    pub creator_receives: f64,
    /// Session balance after the optimistic debit.
    pub remaining_balance: f64,
    /// Cumulative spend on the session.
    pub total_spent: f64,
}

/// Fired when an inbound tip arrives (this client is the payee).
#[derive(Debug, Clone, Serialize)]
pub struct TipReceivedEvent {
    /// Tip amount in decimal currency units.
    pub amount: f64,
    /// Platform commission, decimal; zero when the message carried none.
    pub commission: f64,
    /// What this client keeps after commission.
    pub creator_receives: f64,
    /// Sender address, when the message carried one.
    pub sender: Option<String>,
    /// Free-form message attached to the tip.
    pub message: String,
    /// Sender-side timestamp, epoch milliseconds.
    pub timestamp: Option<u64>,
}

/// Fired when the ClearNode pushes an authoritative balance.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BalanceUpdateEvent {
    /// New session balance in decimal currency units.
    pub balance: f64,
}

/// Fired when a session closes, locally or by remote confirmation.
#[derive(Debug, Clone)]
pub enum SessionClosedEvent {
    /// Locally initiated close, with full accounting.
    Settled(SessionSummary),
    /// Remote confirmation, echoing whatever fields the ClearNode sent.
    Remote(serde_json::Value),
}

/// Stable subtype tags for error events, matching the wire vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Initialization,
    Connection,
    MaxReconnectAttempts,
    SessionCreation,
    Tip,
    SessionClose,
    Clearnode,
    Signing,
}

impl ErrorKind {
    /// The wire-stable tag for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Initialization => "initialization_error",
            ErrorKind::Connection => "connection_error",
            ErrorKind::MaxReconnectAttempts => "max_reconnect_attempts",
            ErrorKind::SessionCreation => "session_creation_error",
            ErrorKind::Tip => "tip_error",
            ErrorKind::SessionClose => "session_close_error",
            ErrorKind::Clearnode => "clearnode_error",
            ErrorKind::Signing => "signing_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fired for every externally observable failure.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    /// Which operation or subsystem failed.
    pub kind: ErrorKind,
    /// Human-readable description of the failure.
    pub message: String,
}
