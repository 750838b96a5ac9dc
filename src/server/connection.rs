//! WebSocket connections
//!
//! One task per client: the upgrade registers a [`ClientSession`], a writer
//! task drains the session's outbound queue into the socket, and the read
//! loop feeds incoming frames to the session until either side closes.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;

use crate::session::{ClientSession, SessionContext};

use super::listener::AppState;

/// `GET <ws_path>`
pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    // Check connection limit
    let permit = match &state.connection_limit {
        Some(limit) => match Arc::clone(limit).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(
                    max_connections = state.config.max_connections,
                    "Connection rejected: limit reached"
                );
                state.session.connections().stats().on_rejected();
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "connection limit reached" })),
                )
                    .into_response();
            }
        },
        None => None,
    };

    let capacity = state.config.queue_capacity;
    let ctx = state.session;

    ws.on_upgrade(move |socket| async move {
        // held for the lifetime of the connection
        let _permit = permit;
        run(socket, ctx, capacity).await;
    })
}

async fn run(socket: WebSocket, ctx: SessionContext, capacity: usize) {
    let (mut sink, mut stream) = socket.split();
    let (mut session, mut outbound) = ClientSession::open(ctx, capacity).await;
    let connection_id = session.id().clone();

    tracing::info!(connection_id = %connection_id, "Client connected");

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame.as_str().into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });
    let mut writer_done = false;

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => session.handle_text(text.as_str()).await,
                Some(Ok(Message::Binary(_))) => session.handle_binary().await,
                Some(Ok(Message::Close(_))) | None => break,
                // ping/pong answered by the transport
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Socket error");
                    break;
                }
            },
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    // Unregistering drops the queue sender, which ends the writer
    session.close().await;
    if !writer_done {
        let _ = writer.await;
    }

    tracing::info!(connection_id = %connection_id, "Client disconnected");
}
