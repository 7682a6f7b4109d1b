//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /ws`: upgrade to a WebSocket carrying live location updates.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let event_rx = state.event_bus.subscribe();
    let connection_id = uuid::Uuid::new_v4();
    tracing::info!(%connection_id, "ws connection opened");

    ws.on_upgrade(move |socket| run_connection(socket, event_rx, connection_id))
}
