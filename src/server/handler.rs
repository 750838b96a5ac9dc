//! REST handlers
//!
//! Queue inspection and mutation for kiosks and dashboards that do not hold
//! a WebSocket. Every mutation goes through the coordinator, so WebSocket
//! clients see the same `queue.update` broadcast either way.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::registry::{
    QueueState, QueueSummary, RegistryError, Ticket, TicketId, TicketStatus, TicketType,
};
use crate::stats::StatsSnapshot;

use super::listener::AppState;

/// REST-level failure, rendered as `{"error": "..."}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Registry(RegistryError::TicketNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Registry(RegistryError::IllegalTransition { .. }) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTicketRequest {
    #[serde(default, rename = "type")]
    ticket_type: TicketType,
    #[serde(default)]
    customer_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    id: Option<TicketId>,
    status: Option<TicketStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub connections: usize,
    pub queue: QueueSummary,
    pub stats: StatsSnapshot,
}

/// `GET /api/queue`
pub async fn list_tickets(State(state): State<AppState>) -> Json<Vec<Ticket>> {
    Json(state.session.coordinator.tickets().get_all().await)
}

/// `POST /api/queue`
///
/// A missing or unparsable body draws an online ticket.
pub async fn create_ticket(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Ticket>) {
    let request: CreateTicketRequest = if body.is_empty() {
        CreateTicketRequest::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Unparsable ticket request, drawing online ticket");
            CreateTicketRequest::default()
        })
    };

    let ticket = state
        .session
        .coordinator
        .create_ticket(request.ticket_type, request.customer_name)
        .await;

    (StatusCode::CREATED, Json(ticket))
}

/// `PATCH /api/queue` with `{id, status}`
pub async fn update_ticket(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Ticket>, ApiError> {
    let request: StatusUpdateRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let (Some(id), Some(status)) = (request.id, request.status) else {
        return Err(ApiError::BadRequest("id and status are required".to_owned()));
    };

    let ticket = state
        .session
        .coordinator
        .set_status(&id, status)
        .await
        .inspect_err(|e| {
            state.session.connections().stats().on_rejected();
            tracing::warn!(ticket = %id, error = %e, "Status update refused");
        })?;

    Ok(Json(ticket))
}

/// `GET /api/queue/state`
pub async fn queue_state(State(state): State<AppState>) -> Json<QueueState> {
    Json(state.session.coordinator.state().await)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let connections = state.session.connections();

    Json(HealthReport {
        status: "ok",
        connections: connections.connection_count().await,
        queue: state.session.coordinator.tickets().summary().await,
        stats: connections.stats().snapshot(),
    })
}
