//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (commissions, decimals, backoff timing)
//! - Check the endpoint URL parses and uses a WebSocket scheme
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the client

use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.clearnode_url) {
        Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
        Ok(url) => errors.push(ValidationError {
            field: "clearnode_url".into(),
            message: format!("scheme must be ws or wss, got {}", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError {
            field: "clearnode_url".into(),
            message: format!("not a valid URL: {}", e),
        }),
    }

    if config.standard_commission > 100 {
        errors.push(ValidationError {
            field: "standard_commission".into(),
            message: format!("must be at most 100, got {}", config.standard_commission),
        });
    }

    if config.partner_commission > 100 {
        errors.push(ValidationError {
            field: "partner_commission".into(),
            message: format!("must be at most 100, got {}", config.partner_commission),
        });
    }

    if config.asset_decimals > 18 {
        errors.push(ValidationError {
            field: "asset_decimals".into(),
            message: format!("must be at most 18, got {}", config.asset_decimals),
        });
    }

    if config.reconnect.base_delay_ms == 0 {
        errors.push(ValidationError {
            field: "reconnect.base_delay_ms".into(),
            message: "must be at least 1".into(),
        });
    }

    if config.reconnect.max_delay_ms < config.reconnect.base_delay_ms {
        errors.push(ValidationError {
            field: "reconnect.max_delay_ms".into(),
            message: format!(
                "must be at least base_delay_ms ({})",
                config.reconnect.base_delay_ms
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
