//! Client error taxonomy.
//!
//! Validation and state errors are synchronous rejections of the calling
//! operation and are never retried. Transport failures during the initial
//! connect reject `connect()`; drops after that point feed the reconnect
//! loop instead of surfacing as hard failures.

use thiserror::Error;

/// Errors surfaced by client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad caller input (missing address, zero deposit, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation is not valid for the current session or connection state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// No session is currently pending or active.
    #[error("no active stream session")]
    NoActiveSession,

    /// Tip target does not match the active session's streamer.
    #[error("active session is with a different streamer: expected {expected}, got {got}")]
    WrongCounterparty { expected: String, got: String },

    /// Tip amount must be strictly positive.
    #[error("tip amount must be greater than 0, got {0}")]
    InvalidAmount(f64),

    /// Tip would push the session balance below zero.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: f64, available: f64 },

    /// Transport open or send failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The wallet rejected or failed to produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The ClearNode reported an error message.
    #[error("clearnode error: {0}")]
    RemoteProtocol(String),

    /// Configuration could not be loaded or did not validate.
    #[error("config error: {0}")]
    Config(String),
}

impl ClientError {
    /// Shorthand for transport errors built from display-able sources.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// Shorthand for signing errors built from display-able sources.
    pub fn signing(err: impl std::fmt::Display) -> Self {
        Self::Signing(err.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::InsufficientBalance {
            requested: 25.0,
            available: 20.0,
        };
        assert!(err.to_string().contains("25"));
        assert!(err.to_string().contains("20"));

        let err = ClientError::WrongCounterparty {
            expected: "0xaaa".into(),
            got: "0xbbb".into(),
        };
        assert!(err.to_string().contains("different streamer"));
    }
}
