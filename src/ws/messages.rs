//! WebSocket message types: envelope, client commands and pushed events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::LocationUpdate;

/// Name of the pushed event carrying a [`LocationUpdate`].
pub const LOCATION_UPDATE_EVENT: &str = "locationUpdate";

/// Top-level server-to-client envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Echo of the client's `id` for responses; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds an envelope stamped with the current time.
    #[must_use]
    pub fn new(id: String, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id,
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Error envelope with a numeric code.
    #[must_use]
    pub fn error(id: String, code: u16, message: &str) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({ "code": code, "message": message }),
        )
    }

    /// Event envelope for a location update.
    #[must_use]
    pub fn location_update(update: &LocationUpdate) -> Self {
        let payload = serde_json::to_value(EventPayload {
            event: LOCATION_UPDATE_EVENT,
            update,
        })
        .unwrap_or_default();
        Self::new(uuid::Uuid::new_v4().to_string(), WsMessageType::Event, payload)
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

#[derive(Serialize)]
struct EventPayload<'a> {
    event: &'static str,
    #[serde(flatten)]
    update: &'a LocationUpdate,
}

/// A frame sent by the client: an optional correlation id plus a command.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    /// Correlation id echoed in the response.
    #[serde(default)]
    pub id: Option<String>,
    /// The command itself.
    #[serde(flatten)]
    pub command: WsCommand,
}

/// Commands that a client can send over WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Receive location updates for these events.
    Subscribe {
        /// Event IDs to subscribe to. Use `["*"]` for all events.
        #[serde(alias = "eventIds")]
        event_ids: Vec<String>,
    },
    /// Stop receiving updates for these events.
    Unsubscribe {
        /// Event IDs to unsubscribe from.
        #[serde(alias = "eventIds")]
        event_ids: Vec<String>,
    },
    /// Liveness probe; answered with `pong`.
    Ping,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventId, ParticipantId};

    #[test]
    fn subscribe_accepts_both_spellings() {
        let snake = r#"{"command":"subscribe","event_ids":["*"]}"#;
        let camel = r#"{"command":"subscribe","eventIds":["*"],"id":"7"}"#;
        for raw in [snake, camel] {
            let Ok(frame) = serde_json::from_str::<ClientFrame>(raw) else {
                panic!("failed to parse {raw}");
            };
            let WsCommand::Subscribe { event_ids } = frame.command else {
                panic!("expected subscribe");
            };
            assert_eq!(event_ids, vec!["*".to_string()]);
        }
    }

    #[test]
    fn ping_has_no_fields() {
        let Ok(frame) = serde_json::from_str::<ClientFrame>(r#"{"command":"ping"}"#) else {
            panic!("failed to parse ping");
        };
        assert!(matches!(frame.command, WsCommand::Ping));
        assert!(frame.id.is_none());
    }

    #[test]
    fn location_update_payload_shape() {
        let event_id = EventId::new();
        let participant_id = ParticipantId::new();
        let msg = WsMessage::location_update(&LocationUpdate {
            event_id,
            participant_id,
            participant_or_user_id: *participant_id.as_uuid(),
            latitude: 10.0,
            longitude: 20.0,
            resolved_zone: None,
            timestamp: Utc::now(),
        });
        assert_eq!(msg.msg_type, WsMessageType::Event);
        let field = |name: &str| msg.payload.get(name).cloned();
        assert_eq!(field("event"), Some(serde_json::json!(LOCATION_UPDATE_EVENT)));
        assert_eq!(field("eventId"), Some(serde_json::json!(event_id.to_string())));
        assert_eq!(field("latitude"), Some(serde_json::json!(10.0)));
        assert!(msg.payload.get("resolvedZone").is_none());
    }
}
