//! Signaling relay
//!
//! Forwards call-setup and camera-setup messages between connections. The
//! relay keeps no call state and never looks inside negotiation payloads:
//! every forwarded event carries the true sender id and is dropped silently
//! when the addressee is gone.
//!
//! Two message families share the same primitive:
//!
//! - call signaling: initiate, accept/reject, signal, hang-up
//! - camera signaling: request (sent to the sellers group), signal

use std::sync::Arc;

use crate::connection::{ConnectionId, ConnectionRegistry, Group, OutboundFrame};
use crate::protocol::{
    AbsentNotice, CallNotice, CallReply, CamRequestForward, HangupNotice, HangupRequest,
    ServerEvent, SignalForward, SignalPayload,
};
use crate::registry::TicketId;

pub use crate::connection::Delivery;

/// Which family a relayed negotiation payload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalTag {
    /// Two-way video call, delivered as `call.signal`
    Call,
    /// One-way camera stream, delivered as `cam.signal-forward`
    Camera,
}

/// Stateless forwarder over the connection registry
#[derive(Clone)]
pub struct SignalingRelay {
    connections: Arc<ConnectionRegistry>,
}

impl SignalingRelay {
    pub fn new(connections: Arc<ConnectionRegistry>) -> Self {
        Self { connections }
    }

    /// Deliver an event to one connection if it is live
    pub async fn relay(&self, to: &ConnectionId, event: ServerEvent) -> Delivery {
        match OutboundFrame::encode(&event) {
            Ok(frame) => self.connections.send_to(to, frame).await,
            Err(e) => {
                tracing::error!(connection_id = %to, error = %e, "Failed to encode relayed event");
                Delivery::Dropped
            }
        }
    }

    /// Forward an opaque negotiation payload, stamped with the sender
    pub async fn relay_signal(
        &self,
        from: &ConnectionId,
        to: &ConnectionId,
        payload: SignalPayload,
        tag: SignalTag,
    ) -> Delivery {
        let forward = SignalForward {
            from_connection_id: from.clone(),
            payload,
        };
        let event = match tag {
            SignalTag::Call => ServerEvent::CallSignal(forward),
            SignalTag::Camera => ServerEvent::CamSignalForward(forward),
        };

        let delivery = self.relay(to, event).await;
        tracing::debug!(from = %from, to = %to, tag = ?tag, delivery = ?delivery, "Signal relayed");
        delivery
    }

    /// Tell a customer a seller is calling about a ticket
    pub async fn incoming_call(
        &self,
        from: &ConnectionId,
        to: &ConnectionId,
        ticket_id: TicketId,
    ) -> Delivery {
        self.relay(
            to,
            ServerEvent::CallIncoming(CallNotice {
                from_connection_id: from.clone(),
                ticket_id,
            }),
        )
        .await
    }

    /// Forward a customer's accept or reject to the calling seller
    pub async fn call_reply(&self, from: &ConnectionId, reply: CallReply, accepted: bool) -> Delivery {
        let notice = CallNotice {
            from_connection_id: from.clone(),
            ticket_id: reply.ticket_id,
        };
        let event = if accepted {
            ServerEvent::CallAccepted(notice)
        } else {
            ServerEvent::CallRejected(notice)
        };

        self.relay(&reply.peer_connection_id, event).await
    }

    pub async fn hangup(&self, from: &ConnectionId, request: HangupRequest) -> Delivery {
        self.relay(
            &request.target_connection_id,
            ServerEvent::CallHangup(HangupNotice {
                from_connection_id: from.clone(),
                ticket_id: request.ticket_id,
            }),
        )
        .await
    }

    /// Tell `to` that a message it addressed to `absent` was not delivered
    pub async fn peer_absent(&self, to: &ConnectionId, absent: &ConnectionId) -> Delivery {
        tracing::debug!(connection_id = %to, absent = %absent, "Relay target absent");

        self.relay(
            to,
            ServerEvent::PeerAbsent(AbsentNotice {
                connection_id: absent.clone(),
            }),
        )
        .await
    }

    /// Ask every registered seller except the requester for a camera stream
    ///
    /// Returns how many sellers the request reached; zero is not an error.
    pub async fn request_camera(&self, buyer: &ConnectionId) -> usize {
        let event = ServerEvent::CamRequestForward(CamRequestForward {
            buyer_connection_id: buyer.clone(),
        });

        let frame = match OutboundFrame::encode(&event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode camera request");
                return 0;
            }
        };

        let reached = self
            .connections
            .send_to_group(Group::Sellers, frame, Some(buyer))
            .await;
        tracing::debug!(buyer = %buyer, sellers = reached, "Camera request forwarded");
        reached
    }
}
