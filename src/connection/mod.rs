//! Connection registry
//!
//! Every live client connection gets a server-assigned [`ConnectionId`] and
//! a bounded outbound queue. The registry is the address book for relayed
//! messages and queue broadcasts.
//!
//! ```text
//!                     Arc<ConnectionRegistry>
//!                ┌────────────────────────────┐
//!                │ connections: HashMap<Id,   │
//!                │   { tx: mpsc::Sender,      │
//!                │     groups }>              │
//!                │ groups: HashMap<Group, Ids>│
//!                └──────────────┬─────────────┘
//!                               │ try_send(OutboundFrame)
//!           ┌───────────────────┼───────────────────┐
//!           ▼                   ▼                   ▼
//!      [writer task]       [writer task]       [writer task]
//!        WebSocket           WebSocket           WebSocket
//! ```

pub mod frame;
pub mod id;
pub mod registry;

pub use frame::OutboundFrame;
pub use id::{ConnectionId, Group};
pub use registry::{ConnectionRegistry, Delivery};
