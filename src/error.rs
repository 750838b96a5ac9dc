//! Crate-level error type

use thiserror::Error;

use crate::lifecycle::LifecycleError;
use crate::protocol::ProtocolError;
use crate::registry::RegistryError;

/// Errors surfaced by the queuecast core
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
