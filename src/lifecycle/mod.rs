//! Endpoint call and stream lifecycles
//!
//! Client-side state machines for the two media features:
//!
//! - [`CallTracker`]: a two-way call between a seller and a ticket's customer
//! - [`CameraBroadcaster`] / [`CameraReceiver`]: a seller's one-way camera
//!   stream fanned out to buyers
//!
//! The trackers are sans-IO. They consume [`ServerEvent`]s and callbacks
//! from a [`PeerBackend`], and return the [`ClientEvent`]s the endpoint
//! should send. Media and negotiations are owned through [`PeerLink`], so
//! any path out of a call or stream releases them in the same step.
//! A `peer.absent` notice about the counterpart is treated like the
//! negotiation closing.
//!
//! [`ServerEvent`]: crate::protocol::ServerEvent
//! [`ClientEvent`]: crate::protocol::ClientEvent

pub mod backend;
pub mod call;
pub mod camera;
pub mod error;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{Negotiation, PeerBackend, PeerLink, PeerRole};
pub use call::{CallState, CallTracker, EndReason, DEFAULT_RING_TIMEOUT};
pub use camera::{CameraBroadcaster, CameraReceiver};
pub use error::{LifecycleError, MediaError};
