//! Client sessions
//!
//! One session per live connection: registration, event dispatch and
//! teardown with group cleanup.

pub mod context;
pub mod handler;
pub mod state;

pub use context::SessionContext;
pub use handler::ClientSession;
pub use state::{SessionPhase, SessionState};
