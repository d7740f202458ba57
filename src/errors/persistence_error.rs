//! Error types for the binary network format.

use thiserror::Error;

use super::EngineError;

/// Errors that can occur while saving or loading a network.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network file ended early while reading {section}: needed {needed} bytes, {available} left")]
    Truncated {
        section: String,
        needed: usize,
        available: usize,
    },

    #[error("Invalid network header: {reason}")]
    InvalidHeader { reason: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}
