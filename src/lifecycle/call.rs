//! Two-way video call tracker
//!
//! Each endpoint runs its own [`CallTracker`]. The two trackers never share
//! state; they are linked only by the events the relay carries between them.
//!
//! ```text
//!            start_call                     remote media
//!   Idle ──────────────────► Calling ─────────────────► Connected
//!    │  ▲                      ▲  │                         │
//!    │  │ reject               │  │ hang-up / close / error │
//!    │  │          accept      │  ▼                         ▼
//!    └──┴─► Incoming ──────────┘ Ended ◄────────────────────┘
//!  call.incoming                  (next call starts from here)
//! ```
//!
//! The caller sends its negotiation output as soon as it is produced. A
//! callee that has not accepted yet holds those signals and applies them to
//! its responder on accept. Because the caller's first offer travels before
//! any answer, a customer who is already gone is reported straight away with
//! `peer.absent`; a customer who simply never answers is caught by the ring
//! deadline checked in [`CallTracker::on_tick`].
//!
//! A finished call stays in `Ended` until the next call starts or
//! [`CallTracker::reset`] is called, so the UI can still show
//! [`CallTracker::end_reason`]. `Ended` accepts everything `Idle` does.
//! A local hang-up is the exception and goes straight back to `Idle`.

use std::time::{Duration, Instant};

use crate::connection::ConnectionId;
use crate::protocol::{
    CallInitiate, CallReply, ClientEvent, HangupRequest, ServerEvent, SignalPayload,
    SignalRequest,
};
use crate::registry::TicketId;

use super::backend::{PeerBackend, PeerLink, PeerRole};
use super::error::{LifecycleError, MediaError};

/// Call state for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    /// Callee only: waiting for the user to accept or reject
    Incoming,
    /// Media acquired, negotiation in progress
    Calling,
    /// Remote media is flowing
    Connected,
    /// Call over and resources released; behaves like idle
    Ended,
}

impl CallState {
    pub fn as_str(self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Incoming => "incoming",
            CallState::Calling => "calling",
            CallState::Connected => "connected",
            CallState::Ended => "ended",
        }
    }

    fn is_free(self) -> bool {
        matches!(self, CallState::Idle | CallState::Ended)
    }

    fn is_in_call(self) -> bool {
        matches!(self, CallState::Calling | CallState::Connected)
    }
}

/// Why the last call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    LocalHangup,
    RemoteHangup,
    /// The callee declined
    Rejected,
    /// The negotiation closed underneath us, e.g. the peer disconnected
    NegotiationClosed,
    /// Nobody picked up before the ring deadline
    Unanswered,
    Failed(String),
}

/// How long a caller waits for `call.accepted` by default
pub const DEFAULT_RING_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-endpoint call state machine
pub struct CallTracker<B: PeerBackend> {
    backend: B,
    state: CallState,
    remote: Option<ConnectionId>,
    ticket: Option<TicketId>,
    initiator: bool,
    accepted: bool,
    // remote signals that arrived while still ringing
    early_signals: Vec<SignalPayload>,
    link: Option<PeerLink<B>>,
    end_reason: Option<EndReason>,
    ring_timeout: Duration,
    dialed_at: Option<Instant>,
}

impl<B: PeerBackend> CallTracker<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: CallState::Idle,
            remote: None,
            ticket: None,
            initiator: false,
            accepted: false,
            early_signals: Vec::new(),
            link: None,
            end_reason: None,
            ring_timeout: DEFAULT_RING_TIMEOUT,
            dialed_at: None,
        }
    }

    /// Override how long an outgoing call rings before giving up
    pub fn with_ring_timeout(mut self, timeout: Duration) -> Self {
        self.ring_timeout = timeout;
        self
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Connection id of the counterpart, if any
    pub fn remote(&self) -> Option<&ConnectionId> {
        self.remote.as_ref()
    }

    pub fn ticket(&self) -> Option<&TicketId> {
        self.ticket.as_ref()
    }

    pub fn end_reason(&self) -> Option<&EndReason> {
        self.end_reason.as_ref()
    }

    /// Whether media or a negotiation is currently held
    pub fn holds_resources(&self) -> bool {
        self.link.is_some()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Call a customer about a ticket
    ///
    /// Acquires local media and creates the initiating negotiation. On a
    /// media failure the tracker stays idle and nothing is sent.
    pub fn start_call(
        &mut self,
        target: ConnectionId,
        ticket_id: TicketId,
    ) -> Result<ClientEvent, LifecycleError> {
        self.require(self.state.is_free(), "start a call")?;

        let link = self.open_link(target.clone(), PeerRole::Initiator)?;

        self.link = Some(link);
        self.state = CallState::Calling;
        self.remote = Some(target.clone());
        self.ticket = Some(ticket_id.clone());
        self.initiator = true;
        self.accepted = false;
        self.early_signals.clear();
        self.end_reason = None;
        self.dialed_at = Some(Instant::now());

        tracing::debug!(remote = %target, ticket = %ticket_id, "Outgoing call");

        Ok(ClientEvent::CallInitiate(CallInitiate {
            ticket_id,
            target_connection_id: target,
        }))
    }

    /// Accept the incoming call
    ///
    /// On a media failure the call stays incoming so the user can retry or
    /// reject. Signals that arrived while ringing are applied to the new
    /// responder; if one of them is unusable the call ends as failed and the
    /// caller's ring deadline ends its side.
    pub fn accept(&mut self) -> Result<ClientEvent, LifecycleError> {
        self.require(self.state == CallState::Incoming, "accept")?;
        let (remote, ticket_id) = self.counterpart("accept")?;

        let mut link = self.open_link(remote.clone(), PeerRole::Responder)?;
        for payload in std::mem::take(&mut self.early_signals) {
            if let Err(e) = link.apply_remote(payload) {
                drop(link);
                self.finish(EndReason::Failed(e.to_string()));
                return Err(e.into());
            }
        }

        self.link = Some(link);
        self.state = CallState::Calling;
        self.accepted = true;

        Ok(ClientEvent::CallAccept(CallReply {
            peer_connection_id: remote,
            ticket_id,
        }))
    }

    /// Decline the incoming call
    pub fn reject(&mut self) -> Result<ClientEvent, LifecycleError> {
        self.require(self.state == CallState::Incoming, "reject")?;
        let (remote, ticket_id) = self.counterpart("reject")?;

        self.reset_to_idle();

        Ok(ClientEvent::CallReject(CallReply {
            peer_connection_id: remote,
            ticket_id,
        }))
    }

    /// Hang up locally
    ///
    /// Releases everything and returns to idle. The caller's hang-up carries
    /// the ticket so the server can mark it done.
    pub fn hang_up(&mut self) -> Option<ClientEvent> {
        match self.state {
            CallState::Incoming => self.reject().ok(),
            CallState::Calling | CallState::Connected => {
                let event = self.hangup_event();
                self.finish(EndReason::LocalHangup);
                self.reset_to_idle();
                event
            }
            CallState::Idle | CallState::Ended => None,
        }
    }

    /// Negotiation output ready to be sent to the counterpart
    pub fn on_local_signal(&self, payload: SignalPayload) -> Option<ClientEvent> {
        let remote = self.link.as_ref()?.remote().clone();

        Some(ClientEvent::CallSignal(SignalRequest {
            target_connection_id: remote,
            payload,
        }))
    }

    /// The counterpart's media arrived
    pub fn on_remote_media(&mut self) {
        if self.state == CallState::Calling {
            self.state = CallState::Connected;
            tracing::debug!(remote = ?self.remote, "Call connected");
        }
    }

    /// The negotiation closed on its own, e.g. because the peer disconnected
    ///
    /// Handled exactly like a remote hang-up.
    pub fn on_negotiation_closed(&mut self) {
        if self.state.is_in_call() {
            self.finish(EndReason::NegotiationClosed);
        }
    }

    /// The negotiation failed; tells the counterpart to hang up too
    pub fn on_negotiation_error(&mut self, error: MediaError) -> Option<ClientEvent> {
        if !self.state.is_in_call() {
            return None;
        }

        let event = self.hangup_event();
        self.finish(EndReason::Failed(error.to_string()));
        event
    }

    /// Give up on an outgoing call nobody answered
    ///
    /// Call periodically; returns the hang-up to send once the ring deadline
    /// has passed without `call.accepted`.
    pub fn on_tick(&mut self, now: Instant) -> Option<ClientEvent> {
        if self.state != CallState::Calling || !self.initiator || self.accepted {
            return None;
        }
        let dialed_at = self.dialed_at?;
        if now.saturating_duration_since(dialed_at) < self.ring_timeout {
            return None;
        }

        let event = self.hangup_event();
        self.finish(EndReason::Unanswered);
        event
    }

    /// Apply a relayed server event; returns events to send back
    pub fn on_event(&mut self, event: &ServerEvent) -> Vec<ClientEvent> {
        match event {
            ServerEvent::CallIncoming(notice) => {
                if !self.state.is_free() {
                    // busy: decline without touching the current call
                    return vec![ClientEvent::CallReject(CallReply {
                        peer_connection_id: notice.from_connection_id.clone(),
                        ticket_id: notice.ticket_id.clone(),
                    })];
                }

                self.state = CallState::Incoming;
                self.remote = Some(notice.from_connection_id.clone());
                self.ticket = Some(notice.ticket_id.clone());
                self.initiator = false;
                self.accepted = false;
                self.early_signals.clear();
                self.end_reason = None;
                Vec::new()
            }
            ServerEvent::CallAccepted(notice) => {
                if self.state != CallState::Calling
                    || !self.initiator
                    || self.accepted
                    || !self.is_remote(&notice.from_connection_id)
                {
                    return Vec::new();
                }

                self.accepted = true;
                self.dialed_at = None;
                tracing::debug!(remote = %notice.from_connection_id, "Call accepted");
                Vec::new()
            }
            ServerEvent::CallRejected(notice) => {
                if self.state == CallState::Calling
                    && self.initiator
                    && self.is_remote(&notice.from_connection_id)
                {
                    self.finish(EndReason::Rejected);
                }
                Vec::new()
            }
            ServerEvent::CallSignal(forward) => {
                if !self.is_remote(&forward.from_connection_id) {
                    return Vec::new();
                }
                if self.state == CallState::Incoming {
                    self.early_signals.push(forward.payload.clone());
                    return Vec::new();
                }
                let Some(link) = self.link.as_mut() else {
                    return Vec::new();
                };

                match link.apply_remote(forward.payload.clone()) {
                    Ok(()) => Vec::new(),
                    Err(e) => self.on_negotiation_error(e).into_iter().collect(),
                }
            }
            ServerEvent::CallHangup(notice) => {
                if !self.is_remote(&notice.from_connection_id) {
                    return Vec::new();
                }
                match self.state {
                    CallState::Incoming => self.reset_to_idle(),
                    CallState::Calling | CallState::Connected => {
                        self.finish(EndReason::RemoteHangup)
                    }
                    CallState::Idle | CallState::Ended => {}
                }
                Vec::new()
            }
            ServerEvent::PeerAbsent(notice) => {
                if !self.is_remote(&notice.connection_id) {
                    return Vec::new();
                }
                match self.state {
                    CallState::Incoming => self.reset_to_idle(),
                    CallState::Calling | CallState::Connected => {
                        self.finish(EndReason::NegotiationClosed)
                    }
                    CallState::Idle | CallState::Ended => {}
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Forget an ended call
    pub fn reset(&mut self) {
        if self.state == CallState::Ended {
            self.reset_to_idle();
        }
    }

    fn open_link(&mut self, remote: ConnectionId, role: PeerRole) -> Result<PeerLink<B>, LifecycleError> {
        let media = self.backend.acquire_media()?;
        // on failure `media` drops here and the device is released
        let peer = self.backend.create_peer(role, Some(&media))?;
        Ok(PeerLink::new(remote, peer, Some(media)))
    }

    fn finish(&mut self, reason: EndReason) {
        self.link = None;
        self.early_signals.clear();
        self.accepted = false;
        self.dialed_at = None;
        self.state = CallState::Ended;

        tracing::debug!(remote = ?self.remote, reason = ?reason, "Call ended");
        self.end_reason = Some(reason);
    }

    fn reset_to_idle(&mut self) {
        self.link = None;
        self.early_signals.clear();
        self.dialed_at = None;
        self.state = CallState::Idle;
        self.remote = None;
        self.ticket = None;
        self.initiator = false;
        self.accepted = false;
    }

    fn hangup_event(&self) -> Option<ClientEvent> {
        let remote = self.remote.clone()?;
        Some(ClientEvent::CallHangup(HangupRequest {
            target_connection_id: remote,
            ticket_id: if self.initiator { self.ticket.clone() } else { None },
        }))
    }

    fn is_remote(&self, id: &ConnectionId) -> bool {
        self.remote.as_ref() == Some(id)
    }

    fn counterpart(&self, action: &'static str) -> Result<(ConnectionId, TicketId), LifecycleError> {
        match (&self.remote, &self.ticket) {
            (Some(remote), Some(ticket)) => Ok((remote.clone(), ticket.clone())),
            _ => Err(LifecycleError::InvalidState {
                action,
                state: self.state.as_str(),
            }),
        }
    }

    fn require(&self, ok: bool, action: &'static str) -> Result<(), LifecycleError> {
        if ok {
            Ok(())
        } else {
            Err(LifecycleError::InvalidState {
                action,
                state: self.state.as_str(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::lifecycle::mock::MockBackend;
    use crate::protocol::{AbsentNotice, CallNotice, HangupNotice, SignalForward};

    fn seller() -> ConnectionId {
        ConnectionId::from("seller")
    }

    fn customer() -> ConnectionId {
        ConnectionId::from("customer")
    }

    fn ticket() -> TicketId {
        TicketId::from("t-1")
    }

    fn notice(from: ConnectionId) -> CallNotice {
        CallNotice {
            from_connection_id: from,
            ticket_id: ticket(),
        }
    }

    fn signal(value: serde_json::Value) -> SignalPayload {
        SignalPayload::new(value)
    }

    fn absent(id: ConnectionId) -> ServerEvent {
        ServerEvent::PeerAbsent(AbsentNotice { connection_id: id })
    }

    #[test]
    fn test_caller_flow() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend.clone());

        let event = tracker.start_call(customer(), ticket()).unwrap();
        assert!(matches!(event, ClientEvent::CallInitiate(_)));
        assert_eq!(tracker.state(), CallState::Calling);
        assert_eq!(backend.media_live(), 1);

        // the offer goes out before the callee has answered
        let offer = tracker.on_local_signal(signal(json!({"type": "offer"})));
        assert!(matches!(
            offer,
            Some(ClientEvent::CallSignal(req)) if req.target_connection_id == customer()
        ));

        let replies = tracker.on_event(&ServerEvent::CallAccepted(notice(customer())));
        assert!(replies.is_empty());
        assert_eq!(tracker.state(), CallState::Calling);
        assert!(tracker.on_tick(Instant::now() + DEFAULT_RING_TIMEOUT * 2).is_none());

        tracker.on_remote_media();
        assert_eq!(tracker.state(), CallState::Connected);

        let hangup = tracker.hang_up().unwrap();
        assert_eq!(
            hangup,
            ClientEvent::CallHangup(HangupRequest {
                target_connection_id: customer(),
                ticket_id: Some(ticket()),
            })
        );
        assert_eq!(tracker.state(), CallState::Idle);
        assert_eq!(tracker.end_reason(), Some(&EndReason::LocalHangup));
        assert_eq!(backend.media_live(), 0);
        assert_eq!(backend.peers_live(), 0);
    }

    #[test]
    fn test_callee_flow() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend.clone());

        let replies = tracker.on_event(&ServerEvent::CallIncoming(notice(seller())));
        assert!(replies.is_empty());
        assert_eq!(tracker.state(), CallState::Incoming);
        assert_eq!(backend.media_live(), 0);

        // the caller's offer arrives while still ringing
        tracker.on_event(&ServerEvent::CallSignal(SignalForward {
            from_connection_id: seller(),
            payload: signal(json!({"type": "offer"})),
        }));
        assert!(backend.applied().is_empty());

        let accept = tracker.accept().unwrap();
        assert_eq!(
            accept,
            ClientEvent::CallAccept(CallReply {
                peer_connection_id: seller(),
                ticket_id: ticket(),
            })
        );
        assert_eq!(tracker.state(), CallState::Calling);
        assert_eq!(backend.media_live(), 1);
        assert_eq!(backend.applied(), vec![signal(json!({"type": "offer"}))]);

        tracker.on_event(&ServerEvent::CallSignal(SignalForward {
            from_connection_id: seller(),
            payload: signal(json!({"candidate": 1})),
        }));
        assert_eq!(backend.applied().len(), 2);

        assert!(tracker.on_local_signal(signal(json!({"type": "answer"}))).is_some());

        tracker.on_remote_media();
        tracker.on_event(&ServerEvent::CallHangup(HangupNotice {
            from_connection_id: seller(),
            ticket_id: None,
        }));
        assert_eq!(tracker.state(), CallState::Ended);
        assert_eq!(tracker.end_reason(), Some(&EndReason::RemoteHangup));
        assert!(!tracker.holds_resources());
        assert_eq!(backend.media_live(), 0);
    }

    #[test]
    fn test_reject_acquires_nothing() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend.clone());
        tracker.on_event(&ServerEvent::CallIncoming(notice(seller())));

        let event = tracker.reject().unwrap();
        assert!(matches!(event, ClientEvent::CallReject(_)));
        assert_eq!(tracker.state(), CallState::Idle);
        assert_eq!(backend.media_created(), 0);
    }

    #[test]
    fn test_caller_sees_rejection() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend.clone());
        tracker.start_call(customer(), ticket()).unwrap();

        tracker.on_event(&ServerEvent::CallRejected(notice(customer())));

        assert_eq!(tracker.state(), CallState::Ended);
        assert_eq!(tracker.end_reason(), Some(&EndReason::Rejected));
        assert_eq!(backend.media_live(), 0);
    }

    #[test]
    fn test_peer_disconnect_while_calling_releases_in_same_step() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend.clone());
        tracker.start_call(customer(), ticket()).unwrap();
        tracker.on_event(&ServerEvent::CallAccepted(notice(customer())));
        assert_eq!(backend.media_live(), 1);

        tracker.on_negotiation_closed();

        assert_eq!(tracker.state(), CallState::Ended);
        assert_eq!(tracker.end_reason(), Some(&EndReason::NegotiationClosed));
        assert_eq!(backend.media_live(), 0);
        assert_eq!(backend.peers_live(), 0);
    }

    #[test]
    fn test_absent_callee_ends_call() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend.clone());
        tracker.start_call(customer(), ticket()).unwrap();

        // someone else going away is not our concern
        tracker.on_event(&absent(ConnectionId::from("stranger")));
        assert_eq!(tracker.state(), CallState::Calling);

        tracker.on_event(&absent(customer()));

        assert_eq!(tracker.state(), CallState::Ended);
        assert_eq!(tracker.end_reason(), Some(&EndReason::NegotiationClosed));
        assert_eq!(backend.media_live(), 0);
        assert_eq!(backend.peers_live(), 0);
    }

    #[test]
    fn test_absent_caller_clears_incoming() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend.clone());
        tracker.on_event(&ServerEvent::CallIncoming(notice(seller())));

        tracker.on_event(&absent(seller()));

        assert_eq!(tracker.state(), CallState::Idle);
        assert!(tracker.remote().is_none());
        assert_eq!(backend.media_created(), 0);
    }

    #[test]
    fn test_unanswered_call_times_out() {
        let backend = MockBackend::default();
        let mut tracker =
            CallTracker::new(backend.clone()).with_ring_timeout(Duration::from_secs(5));
        tracker.start_call(customer(), ticket()).unwrap();

        assert!(tracker.on_tick(Instant::now()).is_none());
        assert_eq!(tracker.state(), CallState::Calling);

        let hangup = tracker.on_tick(Instant::now() + Duration::from_secs(6));

        assert_eq!(
            hangup,
            Some(ClientEvent::CallHangup(HangupRequest {
                target_connection_id: customer(),
                ticket_id: Some(ticket()),
            }))
        );
        assert_eq!(tracker.state(), CallState::Ended);
        assert_eq!(tracker.end_reason(), Some(&EndReason::Unanswered));
        assert_eq!(backend.media_live(), 0);
        // only fires once
        assert!(tracker.on_tick(Instant::now() + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_callee_never_times_out() {
        let mut tracker =
            CallTracker::new(MockBackend::default()).with_ring_timeout(Duration::ZERO);
        tracker.on_event(&ServerEvent::CallIncoming(notice(seller())));
        tracker.accept().unwrap();

        assert!(tracker.on_tick(Instant::now() + Duration::from_secs(60)).is_none());
        assert_eq!(tracker.state(), CallState::Calling);
    }

    #[test]
    fn test_bad_early_signal_fails_accept() {
        let backend = MockBackend::rejecting_remote();
        let mut tracker = CallTracker::new(backend.clone());
        tracker.on_event(&ServerEvent::CallIncoming(notice(seller())));
        tracker.on_event(&ServerEvent::CallSignal(SignalForward {
            from_connection_id: seller(),
            payload: signal(json!("garbage")),
        }));

        assert!(matches!(
            tracker.accept(),
            Err(LifecycleError::Media(MediaError::Negotiation(_)))
        ));
        assert_eq!(tracker.state(), CallState::Ended);
        assert!(matches!(tracker.end_reason(), Some(EndReason::Failed(_))));
        assert_eq!(backend.media_live(), 0);
        assert_eq!(backend.peers_live(), 0);
    }

    #[test]
    fn test_negotiation_failure_ends_call_and_notifies_peer() {
        let backend = MockBackend::rejecting_remote();
        let mut tracker = CallTracker::new(backend.clone());
        tracker.on_event(&ServerEvent::CallIncoming(notice(seller())));
        tracker.accept().unwrap();

        let out = tracker.on_event(&ServerEvent::CallSignal(SignalForward {
            from_connection_id: seller(),
            payload: signal(json!("garbage")),
        }));

        assert_eq!(
            out,
            vec![ClientEvent::CallHangup(HangupRequest {
                target_connection_id: seller(),
                ticket_id: None,
            })]
        );
        assert_eq!(tracker.state(), CallState::Ended);
        assert!(matches!(tracker.end_reason(), Some(EndReason::Failed(_))));
        assert_eq!(backend.media_live(), 0);
    }

    #[test]
    fn test_media_denied_stays_idle() {
        let backend = MockBackend::denying_media();
        let mut tracker = CallTracker::new(backend.clone());

        let result = tracker.start_call(customer(), ticket());

        assert_eq!(
            result,
            Err(LifecycleError::Media(MediaError::PermissionDenied))
        );
        assert_eq!(tracker.state(), CallState::Idle);
        assert!(!tracker.holds_resources());
    }

    #[test]
    fn test_media_denied_on_accept_keeps_incoming() {
        let backend = MockBackend::denying_media();
        let mut tracker = CallTracker::new(backend);
        tracker.on_event(&ServerEvent::CallIncoming(notice(seller())));

        assert!(tracker.accept().is_err());
        assert_eq!(tracker.state(), CallState::Incoming);
        assert!(matches!(tracker.reject(), Ok(ClientEvent::CallReject(_))));
    }

    #[test]
    fn test_signals_from_strangers_are_ignored() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend.clone());
        tracker.on_event(&ServerEvent::CallIncoming(notice(seller())));
        tracker.accept().unwrap();

        tracker.on_event(&ServerEvent::CallSignal(SignalForward {
            from_connection_id: ConnectionId::from("intruder"),
            payload: signal(json!({"type": "offer"})),
        }));
        tracker.on_event(&ServerEvent::CallHangup(HangupNotice {
            from_connection_id: ConnectionId::from("intruder"),
            ticket_id: None,
        }));

        assert!(backend.applied().is_empty());
        assert_eq!(tracker.state(), CallState::Calling);
    }

    #[test]
    fn test_busy_tracker_declines_second_caller() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend);
        tracker.on_event(&ServerEvent::CallIncoming(notice(seller())));
        tracker.accept().unwrap();

        let other = ConnectionId::from("seller-2");
        let out = tracker.on_event(&ServerEvent::CallIncoming(notice(other.clone())));

        assert!(matches!(
            &out[0],
            ClientEvent::CallReject(reply) if reply.peer_connection_id == other
        ));
        assert_eq!(tracker.remote(), Some(&seller()));
    }

    #[test]
    fn test_ended_tracker_takes_next_call() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend.clone());
        tracker.start_call(customer(), ticket()).unwrap();
        tracker.on_negotiation_closed();
        assert_eq!(tracker.state(), CallState::Ended);

        tracker.start_call(customer(), TicketId::from("t-2")).unwrap();
        assert_eq!(tracker.state(), CallState::Calling);
        assert_eq!(tracker.end_reason(), None);
        assert_eq!(backend.media_live(), 1);

        tracker.hang_up();
        tracker.reset();
        assert_eq!(tracker.state(), CallState::Idle);
    }

    #[test]
    fn test_invalid_actions() {
        let mut tracker = CallTracker::new(MockBackend::default());

        assert!(matches!(
            tracker.accept(),
            Err(LifecycleError::InvalidState { action: "accept", state: "idle" })
        ));
        assert!(tracker.hang_up().is_none());

        tracker.start_call(customer(), ticket()).unwrap();
        assert!(matches!(
            tracker.start_call(customer(), ticket()),
            Err(LifecycleError::InvalidState { state: "calling", .. })
        ));
    }

    #[test]
    fn test_dropping_tracker_releases_media() {
        let backend = MockBackend::default();
        let mut tracker = CallTracker::new(backend.clone());
        tracker.start_call(customer(), ticket()).unwrap();

        drop(tracker);

        assert_eq!(backend.media_live(), 0);
        assert_eq!(backend.peers_live(), 0);
    }
}
