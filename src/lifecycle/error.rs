//! Lifecycle error types

use thiserror::Error;

/// Failures from local media devices or the negotiation engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// The user or platform refused camera/microphone access
    #[error("Media access denied")]
    PermissionDenied,

    #[error("Media device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The negotiation engine rejected remote data or failed internally
    #[error("Negotiation failed: {0}")]
    Negotiation(String),
}

/// Errors from the local call and stream trackers
///
/// These stay on the endpoint; nothing here is reported to the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The action is not valid in the tracker's current state
    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Media(#[from] MediaError),
}
