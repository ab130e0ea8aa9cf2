//! Message signing capability and local-key implementation.
//!
//! # Security
//! - Private keys are loaded from a constructor argument or environment variable
//! - Keys are never logged or serialized
//! - Everything above this module sees only an address and a sign method

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;

use crate::error::{ClientError, Result};

/// Environment variable name for the viewer's private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "TIPSTREAM_PRIVATE_KEY";

/// Asynchronous message-signing capability supplied by a wallet.
///
/// Every outgoing envelope is signed over its canonical message string via
/// this trait. A rejected or failed signature is fatal to the calling
/// operation and surfaces as [`ClientError::Signing`].
#[async_trait]
pub trait MessageSigner: Send + Sync {
    /// The account address the signatures belong to.
    fn address(&self) -> String;

    /// Sign an arbitrary message string, returning a hex-encoded signature.
    async fn sign(&self, message: &str) -> Result<String>;
}

/// Wallet backed by a locally held private key.
#[derive(Debug, Clone)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
}

impl LocalWallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// Accepts the key with or without a `0x` prefix. The key is parsed and
    /// held in memory; it is never logged.
    pub fn from_private_key(private_key_hex: &str) -> Result<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ClientError::Signing(format!("invalid private key format: {}", e)))?;

        tracing::info!(address = %signer.address(), "wallet initialized");

        Ok(Self { signer })
    }

    /// Load the wallet key from the `TIPSTREAM_PRIVATE_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            ClientError::Signing(format!(
                "environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key)
    }
}

#[async_trait]
impl MessageSigner for LocalWallet {
    fn address(&self) -> String {
        self.signer.address().to_string()
    }

    async fn sign(&self, message: &str) -> Result<String> {
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| ClientError::Signing(format!("message signing failed: {}", e)))?;

        Ok(format!("0x{}", alloy::hex::encode(signature.as_bytes())))
    }
}
