//! Client and server event catalogs
//!
//! Each frame is `{"event": "<name>", "data": <payload>}`. Events without a
//! payload may omit `data`.

use serde::{Deserialize, Serialize};

use crate::registry::Ticket;

use super::error::ProtocolError;
use super::payload::*;

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Bind this connection to a ticket
    #[serde(rename = "queue.join")]
    QueueJoin(TicketRef),

    /// Ask for the full ticket list
    #[serde(rename = "queue.request")]
    QueueRequest,

    /// Seller announces a ticket
    #[serde(rename = "queue.call")]
    QueueCall(TicketRef),

    /// Mark a ticket done
    #[serde(rename = "queue.done")]
    QueueDone(TicketRef),

    /// Seller starts a video call with a ticket's customer
    #[serde(rename = "call.initiate")]
    CallInitiate(CallInitiate),

    #[serde(rename = "call.accept")]
    CallAccept(CallReply),

    #[serde(rename = "call.reject")]
    CallReject(CallReply),

    /// Negotiation data for the call peer
    #[serde(rename = "call.signal")]
    CallSignal(SignalRequest),

    #[serde(rename = "call.hangup")]
    CallHangup(HangupRequest),

    #[serde(rename = "payment.complete")]
    PaymentComplete(PaymentComplete),

    /// Join the sellers group to receive camera requests
    #[serde(rename = "cam.register-seller")]
    CamRegisterSeller,

    /// Buyer asks any seller for a camera stream
    #[serde(rename = "cam.request")]
    CamRequest,

    /// Negotiation data for a camera stream
    #[serde(rename = "cam.signal")]
    CamSignal(SignalRequest),
}

impl ClientEvent {
    /// Decode one text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Wire name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::QueueJoin(_) => "queue.join",
            ClientEvent::QueueRequest => "queue.request",
            ClientEvent::QueueCall(_) => "queue.call",
            ClientEvent::QueueDone(_) => "queue.done",
            ClientEvent::CallInitiate(_) => "call.initiate",
            ClientEvent::CallAccept(_) => "call.accept",
            ClientEvent::CallReject(_) => "call.reject",
            ClientEvent::CallSignal(_) => "call.signal",
            ClientEvent::CallHangup(_) => "call.hangup",
            ClientEvent::PaymentComplete(_) => "payment.complete",
            ClientEvent::CamRegisterSeller => "cam.register-seller",
            ClientEvent::CamRequest => "cam.request",
            ClientEvent::CamSignal(_) => "cam.signal",
        }
    }
}

/// Events sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "connection.ready")]
    ConnectionReady(ConnectionReady),

    /// Full ticket list, ascending by number
    #[serde(rename = "queue.update")]
    QueueUpdate(Vec<Ticket>),

    /// Sent to the customer whose ticket was called
    #[serde(rename = "queue.called")]
    QueueCalled(TicketNotice),

    #[serde(rename = "call.incoming")]
    CallIncoming(CallNotice),

    #[serde(rename = "call.accepted")]
    CallAccepted(CallNotice),

    #[serde(rename = "call.rejected")]
    CallRejected(CallNotice),

    #[serde(rename = "call.signal")]
    CallSignal(SignalForward),

    #[serde(rename = "call.hangup")]
    CallHangup(HangupNotice),

    #[serde(rename = "payment.received")]
    PaymentReceived(PaymentNotice),

    #[serde(rename = "cam.request-forward")]
    CamRequestForward(CamRequestForward),

    #[serde(rename = "cam.signal-forward")]
    CamSignalForward(SignalForward),

    /// A call or camera message from this connection could not be delivered
    #[serde(rename = "peer.absent")]
    PeerAbsent(AbsentNotice),

    /// A request from this connection was refused
    #[serde(rename = "error")]
    Error(ErrorNotice),
}

impl ServerEvent {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorNotice {
            code: code.to_owned(),
            message: message.into(),
        })
    }
}
