//! Pure numeric helpers for currency amounts.
//!
//! # Data Flow
//! ```text
//! caller amount (decimal dollars)
//!     → commission.rs (split into platform commission + creator payout)
//!     → convert.rs (decimal → integer asset units for the wire)
//!
//! inbound wire amount (integer asset units)
//!     → convert.rs (integer units → decimal for events/UI)
//! ```
//!
//! # Design Decisions
//! - Conversion never rounds a sub-unit remainder upward; value is only
//!   ever dropped, never created
//! - Commission math stays in decimal; unit conversion happens once, at
//!   the wire boundary

pub mod commission;
pub mod convert;

pub use commission::{commission_split, CommissionSplit};
pub use convert::{from_units, to_units};
