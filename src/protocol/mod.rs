//! Wire protocol toward the ClearNode.
//!
//! # Data Flow
//! ```text
//! session operations
//!     → codec.rs (build canonical payload, sign via wallet, wrap in
//!       a JSON-RPC envelope with a monotonic request id)
//!     → connection layer (text frame out)
//!
//! raw inbound frame
//!     → codec.rs (parse by `type` tag into InboundMessage)
//!     → session layer (state changes + events)
//! ```
//!
//! # Design Decisions
//! - Signatures always cover the canonical unsigned payload string, never
//!   the object the signature is attached to
//! - Integer asset amounts cross the wire as strings; inbound amounts are
//!   accepted as either JSON strings or numbers
//! - Unknown inbound tags parse to `Unknown` and are ignored, so new
//!   ClearNode message types never break older clients

pub mod codec;
pub mod types;

pub use codec::ProtocolCodec;
pub use types::{Allocation, AppDefinition, InboundMessage, SessionProposal, TipPayload};
