//! Per-connection event dispatch
//!
//! A [`ClientSession`] owns one registered connection. It decodes client
//! frames, routes queue actions to the coordinator and negotiation traffic
//! to the relay, and answers refused requests with an `error` event.

use tokio::sync::mpsc;

use crate::connection::{ConnectionId, Delivery, Group, OutboundFrame};
use crate::error::Error;
use crate::protocol::{ClientEvent, ConnectionReady, ProtocolError, ServerEvent};
use crate::registry::RegistryError;
use crate::relay::{SignalTag, SignalingRelay};

use super::context::SessionContext;
use super::state::SessionState;

/// Server side of one client connection
pub struct ClientSession {
    ctx: SessionContext,
    state: SessionState,
}

impl ClientSession {
    /// Register a new connection and send it the `connection.ready` greeting
    ///
    /// Returns the session and the receiving end of its outbound queue.
    pub async fn open(
        ctx: SessionContext,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let id = ConnectionId::generate();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));

        // queued before registering so no broadcast can overtake it
        let greeting = ServerEvent::ConnectionReady(ConnectionReady {
            connection_id: id.clone(),
            ice_servers: ctx.ice_servers.to_vec(),
        });
        match OutboundFrame::encode(&greeting) {
            Ok(frame) => {
                if tx.try_send(frame).is_ok() {
                    ctx.connections().stats().on_delivered();
                }
            }
            Err(e) => tracing::error!(connection_id = %id, error = %e, "Failed to encode greeting"),
        }
        ctx.connections().register(id.clone(), tx).await;

        let mut session = Self {
            state: SessionState::new(id),
            ctx,
        };
        session.state.activate();

        (session, rx)
    }

    pub fn id(&self) -> &ConnectionId {
        &self.state.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Decode and dispatch one text frame
    ///
    /// Never fails: refused frames are reported back to this connection.
    pub async fn handle_text(&mut self, text: &str) {
        let result = match ClientEvent::parse(text) {
            Ok(event) => self.handle(event).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = result {
            self.reject(&e).await;
        }
    }

    pub async fn handle_binary(&mut self) {
        self.reject(&ProtocolError::Binary.into()).await;
    }

    /// Dispatch one decoded event
    pub async fn handle(&mut self, event: ClientEvent) -> Result<(), Error> {
        if !self.state.is_active() {
            tracing::debug!(connection_id = %self.state.id, event = event.name(), "Event after close ignored");
            return Ok(());
        }

        self.state.events_handled += 1;
        tracing::debug!(connection_id = %self.state.id, event = event.name(), "Event received");

        let me = self.state.id.clone();
        let coordinator = &self.ctx.coordinator;
        let relay = &self.ctx.relay;

        match event {
            ClientEvent::QueueJoin(req) => {
                if !coordinator.join(&req.ticket_id, &me).await {
                    return Err(RegistryError::TicketNotFound(req.ticket_id).into());
                }
                self.state.tickets.insert(req.ticket_id);
            }
            ClientEvent::QueueRequest => {
                coordinator.send_queue_to(&me).await;
            }
            ClientEvent::QueueCall(req) => {
                coordinator.call_ticket(&req.ticket_id).await?;
            }
            ClientEvent::QueueDone(req) => {
                coordinator.complete(&req.ticket_id).await?;
            }
            ClientEvent::CallInitiate(req) => {
                // The call is forwarded even if the ticket cannot move to serving
                let serving = coordinator.start_serving(&req.ticket_id).await;
                let delivery = relay
                    .incoming_call(&me, &req.target_connection_id, req.ticket_id)
                    .await;
                report_absent(relay, &me, &req.target_connection_id, delivery).await;
                serving?;
            }
            ClientEvent::CallAccept(reply) => {
                let target = reply.peer_connection_id.clone();
                let delivery = relay.call_reply(&me, reply, true).await;
                report_absent(relay, &me, &target, delivery).await;
            }
            ClientEvent::CallReject(reply) => {
                let target = reply.peer_connection_id.clone();
                let delivery = relay.call_reply(&me, reply, false).await;
                report_absent(relay, &me, &target, delivery).await;
            }
            ClientEvent::CallSignal(req) => {
                let delivery = relay
                    .relay_signal(&me, &req.target_connection_id, req.payload, SignalTag::Call)
                    .await;
                report_absent(relay, &me, &req.target_connection_id, delivery).await;
            }
            ClientEvent::CallHangup(req) => {
                let completed = match &req.ticket_id {
                    Some(ticket_id) => coordinator.complete(ticket_id).await.map(|_| ()),
                    None => Ok(()),
                };
                let target = req.target_connection_id.clone();
                let delivery = relay.hangup(&me, req).await;
                report_absent(relay, &me, &target, delivery).await;
                completed?;
            }
            ClientEvent::PaymentComplete(payment) => {
                coordinator.payment_received(payment).await?;
            }
            ClientEvent::CamRegisterSeller => {
                self.ctx.connections().join_group(&me, Group::Sellers).await;
                self.state.is_seller = true;
            }
            ClientEvent::CamRequest => {
                relay.request_camera(&me).await;
            }
            ClientEvent::CamSignal(req) => {
                let delivery = relay
                    .relay_signal(&me, &req.target_connection_id, req.payload, SignalTag::Camera)
                    .await;
                report_absent(relay, &me, &req.target_connection_id, delivery).await;
            }
        }

        Ok(())
    }

    async fn reject(&mut self, error: &Error) {
        self.state.events_rejected += 1;
        self.ctx.connections().stats().on_rejected();

        tracing::warn!(connection_id = %self.state.id, error = %error, "Request refused");

        let event = ServerEvent::error(error_code(error), error.to_string());
        self.ctx.relay.relay(&self.state.id, event).await;
    }

    /// Unregister the connection and release its group memberships
    ///
    /// Once this returns, relays addressed to this id resolve to an absent peer.
    pub async fn close(&mut self) {
        if self.state.phase == super::SessionPhase::Closed {
            return;
        }

        self.state.close();
        self.ctx.connections().unregister(&self.state.id).await;
        self.state.finish();

        tracing::info!(
            connection_id = %self.state.id,
            handled = self.state.events_handled,
            rejected = self.state.events_rejected,
            seller = self.state.is_seller,
            tickets = ?self.state.tickets,
            duration_secs = self.state.duration().as_secs(),
            "Session closed"
        );
    }
}

/// Answer an undeliverable call or camera message with `peer.absent`
async fn report_absent(
    relay: &SignalingRelay,
    sender: &ConnectionId,
    target: &ConnectionId,
    delivery: Delivery,
) {
    if delivery == Delivery::PeerAbsent {
        relay.peer_absent(sender, target).await;
    }
}

fn error_code(error: &Error) -> &'static str {
    match error {
        Error::Protocol(_) => "malformed",
        Error::Registry(RegistryError::TicketNotFound(_)) => "not-found",
        Error::Registry(RegistryError::IllegalTransition { .. }) => "illegal-transition",
        Error::Lifecycle(_) | Error::Io(_) => "internal",
    }
}
