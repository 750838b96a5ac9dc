//! Session state machine
//!
//! Tracks one client connection from registration to teardown.

use std::collections::HashSet;
use std::time::Instant;

use crate::connection::ConnectionId;
use crate::registry::TicketId;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Transport up, not yet registered
    Connected,
    /// Registered and dispatching events
    Active,
    /// Transport closing, unregistering
    Closing,
    /// Session closed
    Closed,
}

/// Per-connection session state
#[derive(Debug)]
pub struct SessionState {
    /// Server-assigned connection id
    pub id: ConnectionId,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Whether this connection registered as a camera seller
    pub is_seller: bool,

    /// Tickets this connection bound itself to
    pub tickets: HashSet<TicketId>,

    /// Events dispatched
    pub events_handled: u64,

    /// Frames or requests refused
    pub events_rejected: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            phase: SessionPhase::Connected,
            connected_at: Instant::now(),
            is_seller: false,
            tickets: HashSet::new(),
            events_handled: 0,
            events_rejected: 0,
        }
    }

    /// Registration finished
    pub fn activate(&mut self) {
        if self.phase == SessionPhase::Connected {
            self.phase = SessionPhase::Active;
        }
    }

    /// Start closing the session
    pub fn close(&mut self) {
        if matches!(self.phase, SessionPhase::Connected | SessionPhase::Active) {
            self.phase = SessionPhase::Closing;
        }
    }

    /// Teardown finished
    pub fn finish(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Check if session is active
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// Get session duration
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}
