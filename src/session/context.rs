//! Session context
//!
//! Shared handles a client session dispatches into.

use std::sync::Arc;

use crate::connection::ConnectionRegistry;
use crate::coordinator::QueueCoordinator;
use crate::protocol::IceServer;
use crate::relay::SignalingRelay;

/// Everything a session needs from the process root
///
/// Built once by the server and cloned into every connection task.
#[derive(Clone)]
pub struct SessionContext {
    pub coordinator: Arc<QueueCoordinator>,
    pub relay: SignalingRelay,
    pub ice_servers: Arc<[IceServer]>,
}

impl SessionContext {
    pub fn new(coordinator: Arc<QueueCoordinator>, ice_servers: Vec<IceServer>) -> Self {
        let relay = SignalingRelay::new(Arc::clone(coordinator.connections()));

        Self {
            coordinator,
            relay,
            ice_servers: ice_servers.into(),
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        self.coordinator.connections()
    }
}
