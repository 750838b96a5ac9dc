//! Protocol error types

use thiserror::Error;

/// Errors decoding a client frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Not valid JSON, unknown event, or missing required fields
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// Binary frames carry no events
    #[error("Binary frames are not supported")]
    Binary,
}
