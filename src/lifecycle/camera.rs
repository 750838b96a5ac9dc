//! One-way camera streams
//!
//! A seller runs a [`CameraBroadcaster`] that keeps one outgoing negotiation
//! per requesting buyer. A buyer runs a [`CameraReceiver`] that binds to the
//! first seller answering its request and ignores the rest.

use std::collections::HashMap;

use crate::connection::ConnectionId;
use crate::protocol::{ClientEvent, ServerEvent, SignalPayload, SignalRequest};

use super::backend::{PeerBackend, PeerLink, PeerRole};
use super::error::{LifecycleError, MediaError};

/// Seller side of the camera stream
pub struct CameraBroadcaster<B: PeerBackend> {
    backend: B,
    // declared before `media` so viewer negotiations close first on drop
    viewers: HashMap<ConnectionId, PeerLink<B>>,
    media: Option<B::Media>,
}

impl<B: PeerBackend> CameraBroadcaster<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            viewers: HashMap::new(),
            media: None,
        }
    }

    /// Event announcing this connection as a camera seller
    pub fn register(&self) -> ClientEvent {
        ClientEvent::CamRegisterSeller
    }

    /// Open the local camera; a no-op when already live
    pub fn start_camera(&mut self) -> Result<(), LifecycleError> {
        if self.media.is_none() {
            self.media = Some(self.backend.acquire_media()?);
            tracing::debug!("Camera started");
        }
        Ok(())
    }

    /// Close every viewer and release the camera
    pub fn stop_camera(&mut self) {
        self.viewers.clear();
        self.media = None;
    }

    pub fn is_live(&self) -> bool {
        self.media.is_some()
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    pub fn has_viewer(&self, buyer: &ConnectionId) -> bool {
        self.viewers.contains_key(buyer)
    }

    pub fn on_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::CamRequestForward(request) => {
                let buyer = &request.buyer_connection_id;

                if self.media.is_none() {
                    tracing::debug!(buyer = %buyer, "Camera request ignored, camera not started");
                    return;
                }
                if self.viewers.contains_key(buyer) {
                    return;
                }

                match self
                    .backend
                    .create_peer(PeerRole::Initiator, self.media.as_ref())
                {
                    Ok(peer) => {
                        self.viewers
                            .insert(buyer.clone(), PeerLink::new(buyer.clone(), peer, None));
                        tracing::debug!(buyer = %buyer, viewers = self.viewers.len(), "Viewer added");
                    }
                    Err(e) => {
                        tracing::warn!(buyer = %buyer, error = %e, "Failed to create viewer negotiation");
                    }
                }
            }
            ServerEvent::CamSignalForward(forward) => {
                let buyer = &forward.from_connection_id;
                let Some(link) = self.viewers.get_mut(buyer) else {
                    return;
                };

                if let Err(e) = link.apply_remote(forward.payload.clone()) {
                    tracing::warn!(buyer = %buyer, error = %e, "Viewer negotiation failed");
                    self.viewers.remove(buyer);
                }
            }
            ServerEvent::PeerAbsent(notice) => {
                if self.on_viewer_closed(&notice.connection_id) {
                    tracing::debug!(buyer = %notice.connection_id, "Viewer gone");
                }
            }
            _ => {}
        }
    }

    /// Negotiation output for one viewer
    pub fn on_local_signal(&self, buyer: &ConnectionId, payload: SignalPayload) -> Option<ClientEvent> {
        if !self.viewers.contains_key(buyer) {
            return None;
        }

        Some(ClientEvent::CamSignal(SignalRequest {
            target_connection_id: buyer.clone(),
            payload,
        }))
    }

    /// A viewer's negotiation closed or failed
    pub fn on_viewer_closed(&mut self, buyer: &ConnectionId) -> bool {
        self.viewers.remove(buyer).is_some()
    }
}

/// Buyer side of the camera stream
pub struct CameraReceiver<B: PeerBackend> {
    backend: B,
    link: Option<PeerLink<B>>,
    ready: bool,
    error: Option<String>,
}

impl<B: PeerBackend> CameraReceiver<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            link: None,
            ready: false,
            error: None,
        }
    }

    /// Ask every seller for a stream
    pub fn request(&self) -> ClientEvent {
        ClientEvent::CamRequest
    }

    /// True while no stream is bound; the client re-sends its request
    /// periodically until a seller answers
    pub fn should_request(&self) -> bool {
        self.link.is_none()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Seller this receiver is bound to
    pub fn seller(&self) -> Option<&ConnectionId> {
        self.link.as_ref().map(PeerLink::remote)
    }

    pub fn on_event(&mut self, event: &ServerEvent) {
        let forward = match event {
            ServerEvent::CamSignalForward(forward) => forward,
            ServerEvent::PeerAbsent(notice) => {
                if self.seller() == Some(&notice.connection_id) {
                    self.on_negotiation_closed();
                }
                return;
            }
            _ => return,
        };
        let seller = &forward.from_connection_id;

        if self.link.is_none() {
            match self.backend.create_peer(PeerRole::Responder, None) {
                Ok(peer) => {
                    tracing::debug!(seller = %seller, "Camera stream bound");
                    self.link = Some(PeerLink::new(seller.clone(), peer, None));
                    self.error = None;
                }
                Err(e) => {
                    self.error = Some(e.to_string());
                    return;
                }
            }
        }

        let Some(link) = self.link.as_mut() else {
            return;
        };
        if link.remote() != seller {
            return;
        }

        if let Err(e) = link.apply_remote(forward.payload.clone()) {
            self.on_negotiation_error(e);
        }
    }

    /// Negotiation output for the bound seller
    pub fn on_local_signal(&self, payload: SignalPayload) -> Option<ClientEvent> {
        let link = self.link.as_ref()?;

        Some(ClientEvent::CamSignal(SignalRequest {
            target_connection_id: link.remote().clone(),
            payload,
        }))
    }

    /// The seller's stream arrived
    pub fn on_remote_media(&mut self) {
        if self.link.is_some() {
            self.ready = true;
            self.error = None;
        }
    }

    pub fn on_negotiation_closed(&mut self) {
        if self.link.is_some() {
            self.tear_down("Camera connection lost".to_owned());
        }
    }

    pub fn on_negotiation_error(&mut self, error: MediaError) {
        self.tear_down(error.to_string());
    }

    fn tear_down(&mut self, reason: String) {
        self.link = None;
        self.ready = false;
        tracing::debug!(reason = %reason, "Camera stream closed");
        self.error = Some(reason);
    }
}
