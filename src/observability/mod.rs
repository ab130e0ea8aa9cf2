//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! connection / session code
//!     → tracing events (structured fields, no subscriber installed here)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → whatever subscriber the host application installs
//!     → whatever metrics recorder/exporter the host installs
//! ```
//!
//! # Design Decisions
//! - The library only records; without a recorder every call is a no-op
//! - Counters only, all cheap atomic increments

pub mod metrics;
