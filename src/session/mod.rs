//! Stream session lifecycle and ledger.
//!
//! # Data Flow
//! ```text
//! caller operation (create / tip / close)
//!     → manager.rs (admission checks under the ledger lock)
//!     → protocol codec (build + sign envelope)
//!     → connection (transmit)
//!     → state.rs (optimistic ledger update)
//!     → events (TipSent, SessionClosed, ...)
//!
//! inbound ClearNode message (via the connection read pump)
//!     → manager.rs (promote / reconcile / relay)
//!     → events (SessionCreated, TipReceived, BalanceUpdate, ...)
//! ```
//!
//! # Design Decisions
//! - One session per manager instance, owned behind a single async mutex so
//!   each operation is atomic from admission check to ledger update
//! - The local ledger is optimistic: tips debit immediately on transmit,
//!   and a later authoritative `balance_update` overwrites the balance
//! - Closing detaches the session; a closed session is immutable

pub mod limits;
pub mod manager;
pub mod state;

pub use limits::SpendingLimitCheck;
pub use manager::{BatchOutcome, SessionManager, SessionOptions, TipRequest};
pub use state::{
    SessionSnapshot, SessionStatus, SessionSummary, SessionTicket, StreamSession, TipReceipt,
};
