//! Ticket queue and signaling relay for live video shopping
//!
//! Customers draw queue tickets, sellers call them up and start a video
//! call, and buyers watch a seller's camera. This crate is the real-time
//! coordination core behind that flow:
//!
//! - [`registry`]: in-memory ticket store with numbering and status
//! - [`connection`]: live connection ids, outbound queues and groups
//! - [`coordinator`]: queue actions, status transitions and full-state fan-out
//! - [`relay`]: payload-opaque forwarding of call and camera negotiation
//! - [`lifecycle`]: per-endpoint call and camera stream state machines
//! - [`server`]: axum WebSocket + REST front-end
//!
//! # Architecture
//!
//! ```text
//!   WebSocket ──► ClientSession ──┬──► QueueCoordinator ──► TicketRegistry
//!   (per conn)     (dispatch)     │          │
//!                                 │          └──► broadcast queue.update
//!                                 │                        │
//!                                 └──► SignalingRelay ─────┤
//!                                                          ▼
//!                                                ConnectionRegistry
//!                                                 (outbound queues)
//! ```
//!
//! The server never keeps call state. Media flows directly between the two
//! endpoints once their negotiation has been relayed.

pub mod connection;
pub mod coordinator;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;
pub mod session;
pub mod stats;

pub use connection::{ConnectionId, ConnectionRegistry, Group};
pub use coordinator::QueueCoordinator;
pub use error::{Error, Result};
pub use protocol::{ClientEvent, ServerEvent, SignalPayload};
pub use registry::{Ticket, TicketId, TicketRegistry, TicketStatus, TicketType};
pub use relay::SignalingRelay;
pub use server::{QueueServer, ServerConfig};
