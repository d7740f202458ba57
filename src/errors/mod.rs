//! Error types for the engine.
//!
//! This module contains specific error types used throughout the library,
//! avoiding generic error wrappers like `anyhow` or `Box<dyn Error>` for better
//! error handling and debugging.

mod config_error;
mod engine_error;
mod persistence_error;

pub use config_error::ConfigError;
pub use engine_error::EngineError;
pub use persistence_error::PersistenceError;

/// Result type alias for device and network operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type alias for saving and loading networks.
pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
