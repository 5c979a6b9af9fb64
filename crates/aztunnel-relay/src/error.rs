//! Relay engine error types.

use thiserror::Error;

/// Errors from a single relay's processing loop.
///
/// Both variants are transport-class: expected at the connection level and
/// absorbed by the orchestrator after logging.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Socket-level I/O failure.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or protocol failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Errors surfaced when creating a relay server.
///
/// Unlike [`RelayError`], these are fatal for the request that triggered
/// them and propagate to the caller.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The local listener could not be bound.
    #[error("failed to bind local listener: {0}")]
    Bind(#[source] std::io::Error),

    /// Target validation or credential derivation failed.
    #[error(transparent)]
    Core(#[from] aztunnel_core::Error),
}
