//! Reconnect delay schedule.

use std::time::Duration;

/// Delay before reconnect attempt `attempt` (1-based):
/// `min(base_ms * 2^attempt, max_ms)`.
///
/// The schedule is deterministic so tests can assert it exactly.
pub fn reconnect_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exponential = 2u64.saturating_pow(attempt);
    let delay_ms = base_ms.saturating_mul(exponential).min(max_ms);
    Duration::from_millis(delay_ms)
}
