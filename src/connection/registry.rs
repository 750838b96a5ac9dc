//! Connection registry implementation
//!
//! Maps connection ids to their outbound queues and tracks group
//! membership. Sends never block: a full or closed queue drops the frame.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, RwLock};

use crate::stats::ServerStats;

use super::frame::OutboundFrame;
use super::id::{ConnectionId, Group};

/// Result of addressing a single connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the connection's outbound channel
    Delivered,
    /// No live connection with this id
    PeerAbsent,
    /// The connection exists but its queue is full or closing
    Dropped,
}

impl Delivery {
    pub fn is_delivered(self) -> bool {
        self == Delivery::Delivered
    }
}

/// Registry entry for a live connection
#[derive(Debug)]
struct ConnectionEntry {
    tx: mpsc::Sender<OutboundFrame>,
    groups: HashSet<Group>,
    connected_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    groups: HashMap<Group, HashSet<ConnectionId>>,
}

/// Registry of live connections
///
/// Connections and group membership share one lock, so an unregister is
/// visible to every later lookup at once.
pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
    stats: Arc<ServerStats>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::with_stats(Arc::new(ServerStats::new()))
    }

    /// Create a registry that records into shared stats
    pub fn with_stats(stats: Arc<ServerStats>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Register a connection with its outbound queue
    ///
    /// Re-registering an id replaces its queue and clears its groups.
    pub async fn register(&self, id: ConnectionId, tx: mpsc::Sender<OutboundFrame>) {
        let mut inner = self.inner.write().await;

        if let Some(old) = inner.connections.remove(&id) {
            for group in old.groups {
                if let Some(members) = inner.groups.get_mut(&group) {
                    members.remove(&id);
                }
            }
            self.stats.on_disconnect();
        }

        inner.connections.insert(
            id.clone(),
            ConnectionEntry {
                tx,
                groups: HashSet::new(),
                connected_at: Instant::now(),
            },
        );
        self.stats.on_connect();

        tracing::info!(
            connection_id = %id,
            connections = inner.connections.len(),
            "Connection registered"
        );
    }

    /// Generate an id, register it, and hand back the receiving end
    pub async fn open(&self, capacity: usize) -> (ConnectionId, mpsc::Receiver<OutboundFrame>) {
        let id = ConnectionId::generate();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.register(id.clone(), tx).await;
        (id, rx)
    }

    /// Remove a connection and release all of its group memberships
    ///
    /// Returns `false` if the id was not registered.
    pub async fn unregister(&self, id: &ConnectionId) -> bool {
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.connections.remove(id) else {
            return false;
        };

        for group in &entry.groups {
            if let Some(members) = inner.groups.get_mut(group) {
                members.remove(id);
                if members.is_empty() {
                    inner.groups.remove(group);
                }
            }
        }
        self.stats.on_disconnect();

        tracing::info!(
            connection_id = %id,
            groups = entry.groups.len(),
            lifetime_secs = entry.connected_at.elapsed().as_secs(),
            "Connection unregistered"
        );

        true
    }

    /// Add a connection to a group
    ///
    /// Returns `false` if the connection is not registered.
    pub async fn join_group(&self, id: &ConnectionId, group: Group) -> bool {
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.connections.get_mut(id) else {
            return false;
        };
        entry.groups.insert(group);
        inner.groups.entry(group).or_default().insert(id.clone());

        tracing::info!(connection_id = %id, group = %group, "Joined group");
        true
    }

    pub async fn members_of(&self, group: Group) -> HashSet<ConnectionId> {
        self.inner
            .read()
            .await
            .groups
            .get(&group)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn is_live(&self, id: &ConnectionId) -> bool {
        self.inner.read().await.connections.contains_key(id)
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Queue a frame for one connection
    pub async fn send_to(&self, id: &ConnectionId, frame: OutboundFrame) -> Delivery {
        let inner = self.inner.read().await;

        match inner.connections.get(id) {
            Some(entry) => self.push(id, entry, frame),
            None => {
                self.stats.on_peer_absent();
                tracing::debug!(connection_id = %id, "Send to absent connection dropped");
                Delivery::PeerAbsent
            }
        }
    }

    /// Queue a frame for every live connection
    ///
    /// Returns the number of connections the frame was queued on.
    pub async fn broadcast(&self, frame: OutboundFrame) -> usize {
        let inner = self.inner.read().await;

        inner
            .connections
            .iter()
            .filter(|(id, entry)| self.push(id, entry, frame.clone()).is_delivered())
            .count()
    }

    /// Queue a frame for every member of a group, optionally skipping one
    pub async fn send_to_group(
        &self,
        group: Group,
        frame: OutboundFrame,
        except: Option<&ConnectionId>,
    ) -> usize {
        let inner = self.inner.read().await;

        let Some(members) = inner.groups.get(&group) else {
            return 0;
        };

        members
            .iter()
            .filter(|id| Some(*id) != except)
            .filter_map(|id| inner.connections.get(id).map(|entry| (id, entry)))
            .filter(|(id, entry)| self.push(id, entry, frame.clone()).is_delivered())
            .count()
    }

    fn push(&self, id: &ConnectionId, entry: &ConnectionEntry, frame: OutboundFrame) -> Delivery {
        match entry.tx.try_send(frame) {
            Ok(()) => {
                self.stats.on_delivered();
                Delivery::Delivered
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.on_dropped();
                tracing::warn!(connection_id = %id, "Outbound queue full, frame dropped");
                Delivery::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.stats.on_dropped();
                tracing::debug!(connection_id = %id, "Outbound queue closed, frame dropped");
                Delivery::Dropped
            }
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
