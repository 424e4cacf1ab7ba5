//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to decode client message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode server message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("empty message frame")]
    EmptyFrame,
}
