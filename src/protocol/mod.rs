//! Wire protocol
//!
//! Named JSON events exchanged over each client's WebSocket.
//!
//! | Client event | Effect |
//! |---|---|
//! | `queue.join` | bind connection to ticket, broadcast |
//! | `queue.request` | reply with `queue.update` |
//! | `queue.call` | waiting -> called, notify customer, broadcast |
//! | `queue.done` | any -> done, broadcast |
//! | `call.initiate` | -> serving, forward `call.incoming` |
//! | `call.accept` / `call.reject` | forward `call.accepted` / `call.rejected` |
//! | `call.signal` | forward opaque payload |
//! | `call.hangup` | optional -> done, forward `call.hangup` |
//! | `payment.complete` | broadcast `payment.received` |
//! | `cam.register-seller` | join the sellers group |
//! | `cam.request` | `cam.request-forward` to every seller |
//! | `cam.signal` | forward opaque payload as `cam.signal-forward` |
//!
//! Call and camera messages addressed to a connection that is gone are
//! answered with `peer.absent {connectionId}` to the sender.

pub mod error;
pub mod event;
pub mod payload;

pub use error::ProtocolError;
pub use event::{ClientEvent, ServerEvent};
pub use payload::{
    AbsentNotice, CallInitiate, CallNotice, CallReply, CamRequestForward, ConnectionReady,
    ErrorNotice, HangupNotice, HangupRequest, IceServer, PaymentComplete, PaymentMethod,
    PaymentNotice, SignalForward, SignalPayload, SignalRequest, TicketNotice, TicketRef,
};
