//! Error types for the bot.

use thiserror::Error;

/// Errors that can occur while driving a bot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Failed to hand an outgoing request to the connection.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to read or decode the next inbound event.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a bridge message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bot has no running packet loop to forward the request to.
    #[error("not connected to server")]
    NotConnected,

    /// The player UUID passed to `connect` could not be parsed.
    #[error("invalid player uuid: {0}")]
    InvalidUuid(#[from] uuid::Error),

    /// The server refused the join handshake.
    #[error("login rejected: {reason}")]
    LoginRejected {
        /// Reason text supplied by the server.
        reason: String,
    },

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;
