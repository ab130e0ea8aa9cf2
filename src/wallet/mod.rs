//! Wallet signing capability.
//!
//! Protocol code never touches key material. It sees a single-method
//! signing capability (`MessageSigner`); the production implementation
//! wraps a local private key, and tests inject their own.

pub mod signer;

pub use signer::{LocalWallet, MessageSigner, PRIVATE_KEY_ENV_VAR};
