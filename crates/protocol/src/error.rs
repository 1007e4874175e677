//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or encoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Message too large: {len} bytes (max {max})")]
    TooLarge { len: usize, max: usize },

    #[error("Binary frames are not supported")]
    UnexpectedBinary,
}
