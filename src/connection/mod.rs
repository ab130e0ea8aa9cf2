//! Duplex transport to the ClearNode.
//!
//! # Data Flow
//! ```text
//! connect()
//!     → transport.rs (Connector dials, yields sink + stream halves)
//!     → manager.rs (stores sink, spawns read pump, fires Connected)
//!
//! read pump
//!     → inbound handler (session layer), one frame at a time, in order
//!     → on stream end: Disconnected event, then the reconnect task
//!
//! reconnect task
//!     → backoff.rs (delay schedule), bounded attempt counter
//! ```
//!
//! # Design Decisions
//! - The transport is injected behind the `Connector` trait; production
//!   dials a WebSocket, tests use the in-memory pair
//! - No queueing of unsent messages: `send` fails when disconnected and the
//!   caller decides what that means
//! - Reconnection is one explicit scheduled task with a bounded counter,
//!   cancelled by an intentional `disconnect()`

pub mod backoff;
pub mod manager;
pub mod transport;

pub use manager::{ConnectionManager, InboundHandler};
pub use transport::{Connector, TransportSink, TransportStream, WsConnector};
