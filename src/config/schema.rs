//! Configuration schema definitions.
//!
//! Every field has a default so a client can be built with
//! `ClientConfig::default()` and selectively overridden, or loaded from a
//! TOML file.

use serde::{Deserialize, Serialize};

/// Root configuration for a tipstream client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// ClearNode endpoint URL (ws:// or wss://).
    pub clearnode_url: String,

    /// Commission percentage for standard streamers.
    pub standard_commission: u8,

    /// Commission percentage for partner streamers.
    pub partner_commission: u8,

    /// Asset identifier used for session allocations.
    pub default_asset: String,

    /// Fixed-point precision of the asset (USDC has 6 decimals).
    pub asset_decimals: u32,

    /// Reconnection policy.
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            clearnode_url: "wss://clearnet-sandbox.yellow.com/ws".to_string(),
            standard_commission: 10,
            partner_commission: 3,
            default_asset: "usdc".to_string(),
            asset_decimals: 6,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Reconnection policy after a transport drop.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Attempts before reconnection stops permanently.
    pub max_attempts: u32,

    /// Base delay; attempt `n` waits `min(base * 2^n, max_delay_ms)`.
    pub base_delay_ms: u64,

    /// Ceiling on the backoff delay.
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}
