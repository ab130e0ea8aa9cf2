//! Session-oriented micropayment channel client.
//!
//! Opens a bilateral off-chain tipping session between a viewer and a
//! streamer against a remote coordinating service (ClearNode), sends signed
//! instant tips over a persistent connection, tracks balances and
//! commissions locally, and settles the session on close.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod observability;
pub mod protocol;
pub mod session;
pub mod units;
pub mod wallet;

pub use client::TipstreamClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use session::{SessionOptions, TipRequest};
pub use wallet::{LocalWallet, MessageSigner};
