//! Ticket types
//!
//! A ticket is a customer's place in the queue. Its `number` defines the
//! serving order; its `status` moves forward through
//! `waiting -> called -> serving -> done`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::ConnectionId;

/// Opaque ticket identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(format!("ticket-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TicketId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for TicketId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// How the customer joined the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TicketType {
    #[default]
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "in-store", alias = "instore")]
    InStore,
}

/// Ticket status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Drawn, not yet announced
    Waiting,
    /// Announced by a seller
    Called,
    /// In a video call with a seller
    Serving,
    /// Finished; terminal
    Done,
}

impl TicketStatus {
    /// Whether moving from `self` to `next` follows the queue graph.
    ///
    /// `done` is reachable from every state. Re-calling a called ticket is
    /// allowed so a seller can repeat the announcement, and a serving ticket
    /// may be served again so a seller can retry a declined call. Nothing
    /// moves back to `waiting`.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;

        match (self, next) {
            (_, Done) => true,
            (Waiting, Called) | (Called, Called) => true,
            (Waiting, Serving) | (Called, Serving) | (Serving, Serving) => true,
            _ => false,
        }
    }

    /// Whether the ticket still holds a place in the line
    pub fn is_pending(self) -> bool {
        matches!(self, TicketStatus::Waiting | TicketStatus::Called)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Waiting => "waiting",
            TicketStatus::Called => "called",
            TicketStatus::Serving => "serving",
            TicketStatus::Done => "done",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queue ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Unique, immutable identifier
    pub id: TicketId,

    /// Serving order; unique and strictly increasing
    pub number: u64,

    #[serde(rename = "type")]
    pub ticket_type: TicketType,

    pub status: TicketStatus,

    /// Free-form name supplied by the customer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    /// Customer's live connection, used to address notifications.
    /// May name a connection that has since gone away.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<ConnectionId>,

    pub joined_at: DateTime<Utc>,
}

impl Ticket {
    pub(super) fn new(number: u64, ticket_type: TicketType, customer_name: Option<String>) -> Self {
        Self {
            id: TicketId::generate(),
            number,
            ticket_type,
            status: TicketStatus::Waiting,
            customer_name,
            connection_id: None,
            joined_at: Utc::now(),
        }
    }
}
