//! Queue server
//!
//! Builds the shared state, mounts the REST and WebSocket routes and serves
//! them on a TCP listener.

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::connection::ConnectionRegistry;
use crate::coordinator::QueueCoordinator;
use crate::error::Result;
use crate::registry::{RegistryConfig, TicketRegistry};
use crate::server::config::ServerConfig;
use crate::server::{connection, handler};
use crate::session::SessionContext;
use crate::stats::ServerStats;

/// State shared by every route
#[derive(Clone)]
pub struct AppState {
    pub session: SessionContext,
    pub config: Arc<ServerConfig>,
    pub connection_limit: Option<Arc<Semaphore>>,
}

/// Ticket queue and signaling server
pub struct QueueServer {
    config: Arc<ServerConfig>,
    session: SessionContext,
    connection_limit: Option<Arc<Semaphore>>,
}

impl QueueServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry_config(config, RegistryConfig::default())
    }

    /// Create a new server with custom registry configuration
    pub fn with_registry_config(config: ServerConfig, registry_config: RegistryConfig) -> Self {
        let connection_limit = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let stats = Arc::new(ServerStats::new());
        let connections = Arc::new(ConnectionRegistry::with_stats(stats));
        let coordinator = Arc::new(QueueCoordinator::new(
            TicketRegistry::with_config(registry_config),
            connections,
        ));
        let session = SessionContext::new(coordinator, config.ice_servers.clone());

        Self {
            config: Arc::new(config),
            session,
            connection_limit,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a reference to the queue coordinator
    pub fn coordinator(&self) -> &Arc<QueueCoordinator> {
        &self.session.coordinator
    }

    /// The HTTP application: REST routes plus the WebSocket endpoint
    pub fn router(&self) -> Router {
        let state = AppState {
            session: self.session.clone(),
            config: Arc::clone(&self.config),
            connection_limit: self.connection_limit.clone(),
        };

        let router = Router::new()
            .route("/health", get(handler::health))
            .route(
                "/api/queue",
                get(handler::list_tickets)
                    .post(handler::create_ticket)
                    .patch(handler::update_ticket),
            )
            .route("/api/queue/state", get(handler::queue_state))
            .route(&self.config.ws_path, get(connection::upgrade))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            ws_path = %self.config.ws_path,
            max_connections = self.config.max_connections,
            "Queue server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }
}
