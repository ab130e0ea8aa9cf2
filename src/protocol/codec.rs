//! Builds, signs, and parses ClearNode envelopes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use serde::Serialize;

use crate::error::{ClientError, Result};
use crate::protocol::types::{
    ClosePayload, CreateSessionMessage, InboundMessage, RpcEnvelope, SessionOpenParams,
    SessionProposal, SignedClose, SignedTip, TipPayload,
};
use crate::wallet::MessageSigner;

/// Request-id source, seeded from the clock on first use.
/// Relaxed ordering is sufficient since we only need uniqueness.
static REQUEST_ID: OnceLock<AtomicU64> = OnceLock::new();

/// Next JSON-RPC request id: time-derived, strictly increasing per process.
pub(crate) fn next_request_id() -> u64 {
    REQUEST_ID
        .get_or_init(|| AtomicU64::new(epoch_millis()))
        .fetch_add(1, Ordering::Relaxed)
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn epoch_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Assembles outgoing envelopes and interprets inbound frames.
///
/// Every outgoing payload is signed over its canonical JSON string via the
/// injected wallet capability before the signature is attached.
pub struct ProtocolCodec {
    signer: Arc<dyn MessageSigner>,
}

impl ProtocolCodec {
    pub fn new(signer: Arc<dyn MessageSigner>) -> Self {
        Self { signer }
    }

    /// Address all outgoing envelopes are stamped with.
    pub fn sender(&self) -> String {
        self.signer.address()
    }

    /// Build and sign a `create_app_session` envelope.
    pub async fn session_open_envelope(&self, proposals: &[SessionProposal]) -> Result<String> {
        let message = encode(&CreateSessionMessage {
            kind: "create_session",
            sessions: proposals,
            timestamp: epoch_millis(),
        })?;
        let signature = self.signer.sign(&message).await?;

        envelope(
            "create_app_session",
            SessionOpenParams {
                message,
                signature,
                sender: self.signer.address(),
            },
        )
    }

    /// Build and sign a `send_state_update` envelope carrying a tip.
    ///
    /// The signature covers the unsigned payload, not the signed object.
    pub async fn tip_envelope(&self, payload: TipPayload) -> Result<String> {
        let canonical = encode(&payload)?;
        let signature = self.signer.sign(&canonical).await?;

        envelope("send_state_update", SignedTip { payload, signature })
    }

    /// Build and sign a `close_session` envelope.
    pub async fn close_envelope(&self, session_id: &str) -> Result<String> {
        let payload = ClosePayload {
            session_id: session_id.to_string(),
            timestamp: epoch_millis(),
        };
        let canonical = encode(&payload)?;
        let signature = self.signer.sign(&canonical).await?;

        envelope(
            "close_session",
            SignedClose {
                payload,
                sender: self.signer.address(),
                signature,
            },
        )
    }

    /// Parse a raw inbound frame by its `type` tag.
    pub fn parse_inbound(raw: &str) -> serde_json::Result<InboundMessage> {
        serde_json::from_str(raw)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| ClientError::Transport(format!("failed to encode payload: {}", e)))
}

fn envelope<P: Serialize>(method: &'static str, params: P) -> Result<String> {
    encode(&RpcEnvelope {
        jsonrpc: "2.0",
        method,
        params,
        id: next_request_id(),
    })
}
