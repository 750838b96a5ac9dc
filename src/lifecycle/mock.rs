//! In-memory backend for tracker tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::protocol::SignalPayload;

use super::backend::{Negotiation, PeerBackend, PeerRole};
use super::error::MediaError;

#[derive(Debug, Default)]
struct Counters {
    media_created: AtomicUsize,
    media_live: AtomicUsize,
    peers_created: AtomicUsize,
    peers_live: AtomicUsize,
    applied: Mutex<Vec<SignalPayload>>,
}

/// Counts live media and negotiations so tests can assert on releases
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    counters: Arc<Counters>,
    deny_media: bool,
    reject_remote: bool,
}

impl MockBackend {
    pub fn denying_media() -> Self {
        Self {
            deny_media: true,
            ..Self::default()
        }
    }

    pub fn rejecting_remote() -> Self {
        Self {
            reject_remote: true,
            ..Self::default()
        }
    }

    pub fn media_created(&self) -> usize {
        self.counters.media_created.load(Ordering::SeqCst)
    }

    pub fn media_live(&self) -> usize {
        self.counters.media_live.load(Ordering::SeqCst)
    }

    pub fn peers_created(&self) -> usize {
        self.counters.peers_created.load(Ordering::SeqCst)
    }

    pub fn peers_live(&self) -> usize {
        self.counters.peers_live.load(Ordering::SeqCst)
    }

    pub fn applied(&self) -> Vec<SignalPayload> {
        self.counters.applied.lock().unwrap().clone()
    }
}

#[derive(Debug)]
pub struct MockMedia(Arc<Counters>);

impl Drop for MockMedia {
    fn drop(&mut self) {
        self.0.media_live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct MockPeer {
    counters: Arc<Counters>,
    reject_remote: bool,
    closed: bool,
}

impl Negotiation for MockPeer {
    fn apply_remote(&mut self, payload: SignalPayload) -> Result<(), MediaError> {
        if self.reject_remote {
            return Err(MediaError::Negotiation("unparseable description".into()));
        }
        self.counters.applied.lock().unwrap().push(payload);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.peers_live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl PeerBackend for MockBackend {
    type Media = MockMedia;
    type Peer = MockPeer;

    fn acquire_media(&mut self) -> Result<MockMedia, MediaError> {
        if self.deny_media {
            return Err(MediaError::PermissionDenied);
        }
        self.counters.media_created.fetch_add(1, Ordering::SeqCst);
        self.counters.media_live.fetch_add(1, Ordering::SeqCst);
        Ok(MockMedia(Arc::clone(&self.counters)))
    }

    fn create_peer(
        &mut self,
        _role: PeerRole,
        _media: Option<&MockMedia>,
    ) -> Result<MockPeer, MediaError> {
        self.counters.peers_created.fetch_add(1, Ordering::SeqCst);
        self.counters.peers_live.fetch_add(1, Ordering::SeqCst);
        Ok(MockPeer {
            counters: Arc::clone(&self.counters),
            reject_remote: self.reject_remote,
            closed: false,
        })
    }
}
