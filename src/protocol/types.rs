//! Envelope and message shapes exchanged with the ClearNode.

use serde::{Deserialize, Deserializer, Serialize};

/// Channel parameters proposed when opening a session.
#[derive(Debug, Clone, Serialize)]
pub struct AppDefinition {
    /// Protocol identifier for streaming sessions.
    pub protocol: String,
    /// The two channel parties: `[viewer, streamer]`.
    pub participants: [String; 2],
    /// Voting weights; equal split for a bilateral channel.
    pub weights: [u32; 2],
    /// Percentage of weights needed for consensus; 100 means both must agree.
    pub quorum: u32,
    /// Challenge period in seconds; 0 for instant finality.
    pub challenge: u64,
    /// Replay-protection nonce, epoch milliseconds at session build time.
    pub nonce: u64,
    /// Free-form session metadata.
    pub metadata: SessionMetadata,
}

/// Descriptive metadata attached to the channel definition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub session_type: String,
    pub commission_rate: u8,
    pub is_partner: bool,
    pub streamer_id: String,
    pub viewer_id: String,
    /// RFC 3339 timestamp of session construction.
    pub timestamp: String,
}

/// Per-participant asset amount at session open.
#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    pub participant: String,
    pub asset: String,
    /// Integer asset units, string-encoded for the wire.
    pub amount: String,
}

/// A channel definition together with its opening allocations.
#[derive(Debug, Clone, Serialize)]
pub struct SessionProposal {
    pub definition: AppDefinition,
    pub allocations: Vec<Allocation>,
}

/// The signed unit inside `create_app_session` params.
#[derive(Debug, Serialize)]
pub(crate) struct CreateSessionMessage<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sessions: &'a [SessionProposal],
    /// Epoch milliseconds.
    pub timestamp: u64,
}

/// Unsigned tip payload; the signature covers exactly this, serialized in
/// declaration order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TipPayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub session_id: String,
    /// Tip amount in integer asset units, string-encoded.
    pub amount: String,
    pub recipient: String,
    pub sender: String,
    pub message: String,
    /// Epoch milliseconds.
    pub timestamp: u64,
    /// Platform commission in integer asset units, string-encoded.
    pub commission: String,
    /// Creator payout in integer asset units, string-encoded.
    pub creator_receives: String,
}

/// Tip payload with the signature attached as a sibling field.
#[derive(Debug, Serialize)]
pub(crate) struct SignedTip {
    #[serde(flatten)]
    pub payload: TipPayload,
    pub signature: String,
}

/// Unsigned close payload; the signature covers exactly this.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClosePayload {
    pub session_id: String,
    /// Epoch milliseconds.
    pub timestamp: u64,
}

/// Close payload plus sender and signature, as sent in params.
#[derive(Debug, Serialize)]
pub(crate) struct SignedClose {
    #[serde(flatten)]
    pub payload: ClosePayload,
    pub sender: String,
    pub signature: String,
}

/// Params of `create_app_session`: the signed message string plus proof.
#[derive(Debug, Serialize)]
pub(crate) struct SessionOpenParams {
    /// The `CreateSessionMessage` as its canonical JSON string.
    pub message: String,
    pub signature: String,
    pub sender: String,
}

/// Outgoing JSON-RPC envelope.
#[derive(Debug, Serialize)]
pub(crate) struct RpcEnvelope<P> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: P,
    pub id: u64,
}

/// Inbound ClearNode message, dispatched by its `type` tag.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// The ClearNode accepted a session-open request.
    SessionCreated(SessionCreatedMsg),
    /// An incoming tip; `state_update` is the same shape under another tag.
    #[serde(alias = "state_update")]
    Tip(IncomingTip),
    /// Authoritative session balance from the ClearNode.
    BalanceUpdate(BalanceUpdateMsg),
    /// Close confirmation; fields echo whatever the ClearNode settled.
    SessionClosed(serde_json::Value),
    /// ClearNode-reported error; non-fatal.
    Error(RemoteErrorMsg),
    /// Anything with a tag this client does not know.
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Stable tag name, for logs and metrics labels.
    pub fn tag(&self) -> &'static str {
        match self {
            InboundMessage::SessionCreated(_) => "session_created",
            InboundMessage::Tip(_) => "tip",
            InboundMessage::BalanceUpdate(_) => "balance_update",
            InboundMessage::SessionClosed(_) => "session_closed",
            InboundMessage::Error(_) => "error",
            InboundMessage::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedMsg {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingTip {
    /// Tip amount in integer asset units.
    #[serde(deserialize_with = "wire_units")]
    pub amount: u64,
    /// Commission in integer asset units; absent means zero.
    #[serde(default, deserialize_with = "wire_units_opt")]
    pub commission: Option<u64>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub message: String,
    /// Sender-side epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceUpdateMsg {
    /// New balance in integer asset units.
    #[serde(deserialize_with = "wire_units")]
    pub balance: u64,
}

#[derive(Debug, Deserialize)]
pub struct RemoteErrorMsg {
    #[serde(default)]
    pub error: String,
}

/// Integer asset units arrive as either a JSON string or a JSON number.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawUnits {
    Number(u64),
    Text(String),
}

impl RawUnits {
    fn value<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            RawUnits::Number(n) => Ok(n),
            RawUnits::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| E::custom(format!("bad unit amount {:?}: {}", s, e))),
        }
    }
}

fn wire_units<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    RawUnits::deserialize(deserializer)?.value()
}

/// `null` and an absent field both mean "no figure".
fn wire_units_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawUnits>::deserialize(deserializer)? {
        Some(raw) => raw.value().map(Some),
        None => Ok(None),
    }
}
