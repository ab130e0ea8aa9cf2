//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! TOML file or ClientConfig::default()
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → ClientConfig (validated, immutable)
//!     → cloned into the client at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a client is built; changes need a new client
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ClientConfig, ReconnectConfig};
pub use validation::validate_config;
