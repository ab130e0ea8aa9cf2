//! Typed event surface toward the presentation layer.
//!
//! # Data Flow
//! ```text
//! session / connection code
//!     → dispatcher.rs (one handler slot per event, last registration wins)
//!     → presentation layer callbacks
//! ```
//!
//! # Design Decisions
//! - One slot per event name; registering again replaces the old handler
//! - Handlers run inline on the task that fired the event, in the order
//!   events occur; there is no queueing or concurrent handler execution
//! - Every externally observable failure is broadcast on the error slot in
//!   addition to being returned to the direct caller

pub mod dispatcher;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use types::{
    BalanceUpdateEvent, ErrorEvent, ErrorKind, SessionClosedEvent, SessionCreatedEvent,
    TipReceivedEvent, TipSentEvent,
};
