//! Outbound frames
//!
//! A server event is serialized once and the resulting text is shared by
//! every connection it is delivered to.

use std::sync::Arc;

use crate::protocol::ServerEvent;

/// A serialized server event, cheap to clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame(Arc<str>);

impl OutboundFrame {
    /// Serialize an event into a frame
    pub fn encode(event: &ServerEvent) -> Result<Self, serde_json::Error> {
        let text = serde_json::to_string(event)?;
        Ok(Self(Arc::from(text)))
    }

    /// Parse the frame back into an event
    pub fn decode(&self) -> Result<ServerEvent, serde_json::Error> {
        serde_json::from_str(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
