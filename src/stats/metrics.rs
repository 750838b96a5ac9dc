//! Server-wide counters
//!
//! Updated lock-free from connection tasks and read by the health endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Live counters shared by every connection task
#[derive(Debug)]
pub struct ServerStats {
    started_at: Instant,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    frames_delivered: AtomicU64,
    frames_dropped: AtomicU64,
    peers_absent: AtomicU64,
    rejected_requests: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            peers_absent: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
        }
    }

    pub fn on_connect(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_disconnect(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Frame dropped because the connection's queue was full or closed
    pub fn on_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Frame addressed to a connection id that is not registered
    pub fn on_peer_absent(&self) {
        self.peers_absent.fetch_add(1, Ordering::Relaxed);
    }

    /// Malformed or refused client request
    pub fn on_rejected(&self) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Get server uptime
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);

        StatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            active_connections: opened.saturating_sub(closed),
            connections_opened: opened,
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            peers_absent: self.peers_absent.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ServerStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub active_connections: u64,
    pub connections_opened: u64,
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub peers_absent: u64,
    pub rejected_requests: u64,
}
