//! Server configuration

use std::net::SocketAddr;

use crate::protocol::IceServer;

/// Public STUN server handed to clients when none is configured
pub const DEFAULT_STUN_URL: &str = "stun:stun.l.google.com:19302";

pub const DEFAULT_PORT: u16 = 3000;

/// Default path of the WebSocket endpoint
pub const DEFAULT_WS_PATH: &str = "/api/socket";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent WebSocket connections (0 = unlimited)
    pub max_connections: usize,

    /// Outbound frames buffered per connection before new ones are dropped
    pub queue_capacity: usize,

    /// Path the WebSocket endpoint is mounted on
    pub ws_path: String,

    /// STUN/TURN servers sent to clients in `connection.ready`
    pub ice_servers: Vec<IceServer>,

    /// Allow cross-origin requests from any origin
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            queue_capacity: 64,
            ws_path: DEFAULT_WS_PATH.to_owned(),
            ice_servers: vec![IceServer::stun(DEFAULT_STUN_URL)],
            cors_permissive: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Build from `PORT` and `QUEUECAST_STUN` (comma-separated URLs)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("PORT") {
            match raw.trim().parse::<u16>() {
                Ok(port) => config.bind_addr.set_port(port),
                Err(_) => tracing::warn!(value = %raw, "Invalid PORT, using {}", DEFAULT_PORT),
            }
        }

        if let Some(raw) = lookup("QUEUECAST_STUN") {
            let servers: Vec<IceServer> = raw
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(IceServer::stun)
                .collect();
            if !servers.is_empty() {
                config.ice_servers = servers;
            }
        }

        config
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-connection outbound queue capacity (at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Mount the WebSocket endpoint elsewhere
    pub fn ws_path(mut self, path: impl Into<String>) -> Self {
        self.ws_path = path.into();
        self
    }

    /// Replace the ICE server list
    pub fn ice_servers(mut self, servers: Vec<IceServer>) -> Self {
        self.ice_servers = servers;
        self
    }

    /// Disable the allow-any CORS layer
    pub fn disable_cors(mut self) -> Self {
        self.cors_permissive = false;
        self
    }
}
