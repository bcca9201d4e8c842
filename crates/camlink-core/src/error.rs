//! Error types for camlink core library.

use thiserror::Error;

/// Result type alias using camlink Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for camlink operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Broker URL could not be parsed
    #[error("Invalid broker URL: {0}")]
    BrokerUrl(String),

    /// Unknown enum value read from storage or the wire
    #[error("Unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
