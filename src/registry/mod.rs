//! Ticket registry
//!
//! The registry owns ticket numbering and status. It is the only place a
//! ticket is mutated; callers are responsible for pushing the full ordered
//! list to every connection after a successful mutation.
//!
//! # Status graph
//!
//! ```text
//!   waiting ──► called ──► serving
//!      │          │           │
//!      └──────────┴─────┬─────┘
//!                       ▼
//!                      done
//! ```
//!
//! `waiting -> serving` is allowed directly (a seller may call a ticket
//! without announcing it first). `called -> called` and `serving -> serving`
//! repeat an announcement or a call. Whether the generic update path enforces
//! this graph is controlled by [`TransitionPolicy`]; [`TicketRegistry::transition`]
//! always enforces it.

pub mod config;
pub mod error;
pub mod store;
pub mod ticket;

pub use config::{RegistryConfig, TransitionPolicy};
pub use error::RegistryError;
pub use store::{QueueState, QueueSummary, TicketRegistry};
pub use ticket::{Ticket, TicketId, TicketStatus, TicketType};
