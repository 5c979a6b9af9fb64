//! Error types for the tunnel relay core library.

use thiserror::Error;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for tunnel relay operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bearer token acquisition failed
    #[error("Token acquisition failed: {0}")]
    Token(String),

    /// The remote tunnel sidecar is not usable
    #[error("Tunnel unavailable: {0}")]
    Tunnel(String),

    /// The target's operating system has no relay support
    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),

    /// Outbound HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
