//! Participant DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{EventId, Participant, ParticipantId, UserId};
use crate::service::JoinRequest;

/// Request body for `POST /participants/join`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinEventRequest {
    /// Event to join.
    pub event_id: EventId,
    /// Stable device identifier; joining twice with the same device is
    /// idempotent.
    pub device_id: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Request body for `POST /participants/join-by-code`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinByCodeRequest {
    /// Event join code (case-insensitive).
    pub join_code: String,
    /// Stable device identifier.
    pub device_id: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

impl JoinEventRequest {
    /// Service input, linking the caller's account when present.
    #[must_use]
    pub fn into_join(self, user_id: Option<UserId>) -> (EventId, JoinRequest) {
        let request = JoinRequest {
            device_id: self.device_id,
            user_id,
            name: self.name,
            phone: self.phone,
        };
        (self.event_id, request)
    }
}

impl JoinByCodeRequest {
    /// Service input, linking the caller's account when present.
    #[must_use]
    pub fn into_join(self, user_id: Option<UserId>) -> (String, JoinRequest) {
        let request = JoinRequest {
            device_id: self.device_id,
            user_id,
            name: self.name,
            phone: self.phone,
        };
        (self.join_code, request)
    }
}

/// Participant representation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    /// Participant identifier.
    pub id: ParticipantId,
    /// Joined event.
    pub event_id: EventId,
    /// Device identifier.
    pub device_id: String,
    /// Linked account, if the join was authenticated.
    pub user_id: Option<UserId>,
    /// Display name.
    pub name: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// `false` after leaving.
    pub is_active: bool,
    /// First join.
    pub joined_at: DateTime<Utc>,
    /// Latest heartbeat or location ping.
    pub last_seen_at: DateTime<Utc>,
}

impl From<Participant> for ParticipantDto {
    fn from(p: Participant) -> Self {
        Self {
            id: p.id,
            event_id: p.event_id,
            device_id: p.device_id,
            user_id: p.user_id,
            name: p.name,
            phone: p.phone,
            is_active: p.is_active,
            joined_at: p.joined_at,
            last_seen_at: p.last_seen_at,
        }
    }
}

/// Query parameters for `GET /events/{id}/participants`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ParticipantListParams {
    /// Only active participants. Defaults to `true`.
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

fn default_active_only() -> bool {
    true
}
