//! The stream session ledger and its lifecycle.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::protocol::codec::epoch_millis;
use crate::protocol::types::{Allocation, AppDefinition};

/// Per-process counter so two sessions created in the same millisecond
/// still get distinct ids.
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a client-assigned session id: time-derived, unique per process.
pub(crate) fn generate_session_id() -> String {
    let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("stream_{}_{}", epoch_millis(), n)
}

/// Lifecycle of a stream session. Transitions are monotonic:
/// pending → active → closed, never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Open request transmitted, awaiting ClearNode confirmation.
    Pending,
    /// Confirmed by the ClearNode.
    Active,
    /// Settled; the session is detached and immutable.
    Closed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Pending => f.write_str("pending"),
            SessionStatus::Active => f.write_str("active"),
            SessionStatus::Closed => f.write_str("closed"),
        }
    }
}

/// The single active stream session between a viewer and a streamer.
///
/// Invariant on the local ledger: `current_balance == initial_deposit -
/// spent`, until an authoritative `balance_update` from the ClearNode
/// overwrites the balance.
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub session_id: String,
    /// Assigned by the ClearNode once it confirms the session.
    pub remote_session_id: Option<String>,
    pub viewer_address: String,
    pub streamer_address: String,
    /// Decimal currency units.
    pub initial_deposit: f64,
    pub current_balance: f64,
    pub spent: f64,
    /// Whole percent.
    pub commission_rate: u8,
    pub is_partner: bool,
    pub status: SessionStatus,
    /// Epoch milliseconds.
    pub created_at: u64,
    pub closed_at: Option<u64>,
    pub app_definition: AppDefinition,
    pub allocations: Vec<Allocation>,
}

impl StreamSession {
    /// Apply an admitted tip to the optimistic local ledger.
    pub fn record_tip(&mut self, amount: f64) {
        self.spent += amount;
        self.current_balance -= amount;
    }

    /// Mark the session closed and produce its accounting summary.
    pub fn close(&mut self, closed_at: u64) -> SessionSummary {
        self.status = SessionStatus::Closed;
        self.closed_at = Some(closed_at);
        SessionSummary {
            session_id: self.session_id.clone(),
            duration_ms: closed_at.saturating_sub(self.created_at),
            total_deposited: self.initial_deposit,
            total_spent: self.spent,
            unused_balance: self.current_balance,
            commission_rate: self.commission_rate,
        }
    }

    /// Read-only view for callers and events.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            remote_session_id: self.remote_session_id.clone(),
            streamer: self.streamer_address.clone(),
            initial_deposit: self.initial_deposit,
            current_balance: self.current_balance,
            spent: self.spent,
            commission_rate: self.commission_rate,
            is_partner: self.is_partner,
            status: self.status,
        }
    }
}

/// Point-in-time view of the active session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub remote_session_id: Option<String>,
    pub streamer: String,
    pub initial_deposit: f64,
    pub current_balance: f64,
    pub spent: f64,
    pub commission_rate: u8,
    pub is_partner: bool,
    pub status: SessionStatus,
}

/// Result of creating a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTicket {
    pub session_id: String,
    pub deposit: f64,
    pub commission_rate: u8,
}

/// Accounting summary of a closed session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub duration_ms: u64,
    pub total_deposited: f64,
    pub total_spent: f64,
    pub unused_balance: f64,
    pub commission_rate: u8,
}

/// Outcome of a single sent tip.
#[derive(Debug, Clone, Serialize)]
pub struct TipReceipt {
    pub amount: f64,
    pub commission: f64,
    pub creator_receives: f64,
    pub remaining_balance: f64,
    pub total_spent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::SessionMetadata;

    fn session() -> StreamSession {
        StreamSession {
            session_id: generate_session_id(),
            remote_session_id: None,
            viewer_address: "0xviewer".into(),
            streamer_address: "0xstreamer".into(),
            initial_deposit: 20.0,
            current_balance: 20.0,
            spent: 0.0,
            commission_rate: 10,
            is_partner: false,
            status: SessionStatus::Pending,
            created_at: 1_000,
            closed_at: None,
            app_definition: AppDefinition {
                protocol: "tipstream-v1".into(),
                participants: ["0xviewer".into(), "0xstreamer".into()],
                weights: [50, 50],
                quorum: 100,
                challenge: 0,
                nonce: 1_000,
                metadata: SessionMetadata {
                    session_type: "streaming".into(),
                    commission_rate: 10,
                    is_partner: false,
                    streamer_id: "0xstreamer".into(),
                    viewer_id: "0xviewer".into(),
                    timestamp: "2026-01-01T00:00:00Z".into(),
                },
            },
            allocations: Vec::new(),
        }
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
        assert!(a.starts_with("stream_"));
    }

    #[test]
    fn test_record_tip_keeps_ledger_invariant() {
        let mut session = session();
        session.record_tip(1.0);
        session.record_tip(2.5);
        assert_eq!(session.spent, 3.5);
        assert!(
            (session.current_balance - (session.initial_deposit - session.spent)).abs() < 1e-9
        );
    }

    #[test]
    fn test_close_summarizes() {
        let mut session = session();
        session.record_tip(8.5);
        let summary = session.close(61_000);
        assert_eq!(session.status, SessionStatus::Closed);
        assert_eq!(session.closed_at, Some(61_000));
        assert_eq!(summary.duration_ms, 60_000);
        assert_eq!(summary.total_spent, 8.5);
        assert_eq!(summary.unused_balance, 11.5);
        assert_eq!(summary.commission_rate, 10);
    }
}
