//! Advisory spending-limit policy.
//!
//! This is a caller-supplied ceiling layered above the hard channel-balance
//! check in tip admission; the two gates are independent.

use serde::Serialize;

/// Percentage of the limit at which the check starts warning.
const WARNING_THRESHOLD_PERCENT: f64 = 90.0;

/// Verdict of a spending-limit check.
#[derive(Debug, Clone, Serialize)]
pub struct SpendingLimitCheck {
    pub allowed: bool,
    pub warning: bool,
    /// Set when denied.
    pub reason: Option<String>,
    /// Spend recorded on the session so far.
    pub current_spent: f64,
    /// The caller-supplied ceiling.
    pub limit: f64,
    /// What the cumulative spend would be after this tip.
    pub would_be: f64,
    /// `would_be / limit`, as a percentage.
    pub percent_used: f64,
}

/// Evaluate a prospective tip against a spending ceiling.
pub fn evaluate(current_spent: f64, tip_amount: f64, limit: f64) -> SpendingLimitCheck {
    let would_be = current_spent + tip_amount;
    let percent_used = if limit > 0.0 {
        would_be / limit * 100.0
    } else {
        100.0
    };

    if would_be > limit {
        return SpendingLimitCheck {
            allowed: false,
            warning: false,
            reason: Some("Spending limit exceeded".into()),
            current_spent,
            limit,
            would_be,
            percent_used,
        };
    }

    SpendingLimitCheck {
        allowed: true,
        warning: percent_used >= WARNING_THRESHOLD_PERCENT,
        reason: None,
        current_spent,
        limit,
        would_be,
        percent_used,
    }
}

/// The check when no session is active: nothing may be spent.
pub fn no_active_session(limit: f64) -> SpendingLimitCheck {
    SpendingLimitCheck {
        allowed: false,
        warning: false,
        reason: Some("No active session".into()),
        current_spent: 0.0,
        limit,
        would_be: 0.0,
        percent_used: 0.0,
    }
}
