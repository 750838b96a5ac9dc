//! Media and negotiation backends
//!
//! The trackers drive an endpoint's peer connection library through these
//! traits. Every acquired resource is held by a [`PeerLink`], which closes
//! the negotiation and drops the local media when it goes out of scope, so
//! every exit path of a tracker releases camera and microphone handles.

use crate::connection::ConnectionId;
use crate::protocol::SignalPayload;

use super::error::MediaError;

/// Which side creates the first offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    Initiator,
    Responder,
}

/// A live negotiation with one remote endpoint
pub trait Negotiation {
    /// Feed negotiation data received from the remote side
    fn apply_remote(&mut self, payload: SignalPayload) -> Result<(), MediaError>;

    /// Tear the negotiation down. Must be idempotent.
    fn close(&mut self);
}

/// Factory for local media and negotiations
pub trait PeerBackend {
    /// Local capture handle; dropping it releases the device
    type Media;

    type Peer: Negotiation;

    /// Open the local camera and microphone
    fn acquire_media(&mut self) -> Result<Self::Media, MediaError>;

    /// Start a negotiation, sending `media` if given
    fn create_peer(
        &mut self,
        role: PeerRole,
        media: Option<&Self::Media>,
    ) -> Result<Self::Peer, MediaError>;
}

/// Scoped ownership of one negotiation and the media it was given
pub struct PeerLink<B: PeerBackend> {
    remote: ConnectionId,
    peer: B::Peer,
    media: Option<B::Media>,
}

impl<B: PeerBackend> PeerLink<B> {
    pub fn new(remote: ConnectionId, peer: B::Peer, media: Option<B::Media>) -> Self {
        Self {
            remote,
            peer,
            media,
        }
    }

    pub fn remote(&self) -> &ConnectionId {
        &self.remote
    }

    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }

    pub fn apply_remote(&mut self, payload: SignalPayload) -> Result<(), MediaError> {
        self.peer.apply_remote(payload)
    }
}

impl<B: PeerBackend> Drop for PeerLink<B> {
    fn drop(&mut self) {
        self.peer.close();
        // media, if any, is released when the field drops
        tracing::debug!(remote = %self.remote, media = self.media.is_some(), "Peer link released");
    }
}
