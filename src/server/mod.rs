//! HTTP and WebSocket front-end
//!
//! - [`QueueServer`]: binds, mounts routes and serves until shutdown
//! - [`ServerConfig`]: bind address, limits, ICE servers
//! - `connection`: per-client WebSocket task
//! - `handler`: REST endpoints under `/api/queue` and `/health`

pub mod config;
pub mod connection;
pub mod handler;
pub mod listener;

pub use config::ServerConfig;
pub use handler::{ApiError, HealthReport};
pub use listener::{AppState, QueueServer};
