//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding location updates for the
//! events the client follows.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{ClientFrame, WsCommand, WsMessage, WsMessageType};
use super::subscription::EventSubscriptions;
use crate::domain::{EventId, LocationUpdate};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and answers each one.
/// - Forwards matching updates from the [`broadcast::Receiver`]. A client
///   that falls behind the bus loses the overwritten updates.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<LocationUpdate>,
    connection_id: uuid::Uuid,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = EventSubscriptions::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Ok(json) = serde_json::to_string(&response) {
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(%connection_id, error = %err, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            update = event_rx.recv() => {
                match update {
                    Ok(update) => {
                        if !subs.wants(&update) {
                            continue;
                        }
                        let msg = WsMessage::location_update(&update);
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(%connection_id, lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::info!(%connection_id, "ws connection closed");
}

/// Splits raw ids into parsed event ids, the wildcard flag and rejects.
fn parse_ids(raw: &[String]) -> (Vec<EventId>, bool, Vec<String>) {
    let mut ids = Vec::new();
    let mut wildcard = false;
    let mut invalid = Vec::new();
    for value in raw {
        if value == "*" {
            wildcard = true;
        } else if let Ok(uuid) = value.parse::<uuid::Uuid>() {
            ids.push(EventId::from_uuid(uuid));
        } else {
            invalid.push(value.clone());
        }
    }
    (ids, wildcard, invalid)
}

fn id_strings(ids: &[EventId]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

/// Applies one client frame and returns the reply.
fn handle_text_message(text: &str, subs: &mut EventSubscriptions) -> WsMessage {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(err) => {
            let message = if serde_json::from_str::<serde_json::Value>(text).is_ok() {
                format!("unknown command: {err}")
            } else {
                "malformed JSON".to_string()
            };
            return WsMessage::error(String::new(), 400, &message);
        }
    };
    let id = frame.id.unwrap_or_default();

    match frame.command {
        WsCommand::Subscribe { event_ids } => {
            let (ids, wildcard, invalid) = parse_ids(&event_ids);
            subs.follow(&ids, wildcard);
            WsMessage::new(
                id,
                WsMessageType::Response,
                serde_json::json!({
                    "subscribed": id_strings(&ids),
                    "invalid": invalid,
                    "count": subs.followed_count(),
                    "wildcard": subs.follows_all(),
                }),
            )
        }
        WsCommand::Unsubscribe { event_ids } => {
            let (ids, wildcard, invalid) = parse_ids(&event_ids);
            subs.unfollow(&ids, wildcard);
            WsMessage::new(
                id,
                WsMessageType::Response,
                serde_json::json!({
                    "unsubscribed": id_strings(&ids),
                    "invalid": invalid,
                    "remainingCount": subs.followed_count(),
                    "wildcard": subs.follows_all(),
                }),
            )
        }
        WsCommand::Ping => WsMessage::new(
            id,
            WsMessageType::Response,
            serde_json::json!({ "pong": true }),
        ),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_then_unsubscribe() {
        let mut subs = EventSubscriptions::new();
        let event_id = EventId::new();
        let text = format!(r#"{{"id":"1","command":"subscribe","event_ids":["{event_id}","nope"]}}"#);
        let reply = handle_text_message(&text, &mut subs);
        assert_eq!(reply.msg_type, WsMessageType::Response);
        assert_eq!(reply.id, "1");
        assert_eq!(reply.payload.get("count"), Some(&serde_json::json!(1)));
        assert_eq!(reply.payload.get("invalid"), Some(&serde_json::json!(["nope"])));
        assert!(subs.follows(event_id));

        let text = format!(r#"{{"command":"unsubscribe","eventIds":["{event_id}"]}}"#);
        let reply = handle_text_message(&text, &mut subs);
        assert_eq!(reply.payload.get("remainingCount"), Some(&serde_json::json!(0)));
        assert!(!subs.follows(event_id));
    }

    #[test]
    fn ping_gets_pong() {
        let mut subs = EventSubscriptions::new();
        let reply = handle_text_message(r#"{"command":"ping","id":"p"}"#, &mut subs);
        assert_eq!(reply.id, "p");
        assert_eq!(reply.payload.get("pong"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn bad_frames_get_errors() {
        let mut subs = EventSubscriptions::new();
        let malformed = handle_text_message("{not json", &mut subs);
        assert_eq!(malformed.msg_type, WsMessageType::Error);
        assert_eq!(
            malformed.payload.get("message"),
            Some(&serde_json::json!("malformed JSON"))
        );

        let unknown = handle_text_message(r#"{"command":"evacuate"}"#, &mut subs);
        assert_eq!(unknown.msg_type, WsMessageType::Error);
    }
}
