//! Registry error types

use thiserror::Error;

use super::ticket::{TicketId, TicketStatus};

/// Error type for ticket registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No ticket with this id
    #[error("Ticket not found: {0}")]
    TicketNotFound(TicketId),

    /// The status change would leave the queue graph
    #[error("Illegal transition for {id}: {from} -> {to}")]
    IllegalTransition {
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    },
}
