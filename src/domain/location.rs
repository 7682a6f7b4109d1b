//! Location pings and the real-time update fanned out to subscribers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{EventId, LocationId, ParticipantId, RiskLevel, Zone, ZoneId};

/// An immutable, append-only location ping.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantLocation {
    /// Row identifier.
    pub id: LocationId,
    /// Participant that reported the position.
    pub participant_id: ParticipantId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Reported accuracy in meters.
    pub accuracy: Option<f64>,
    /// Zone the point was classified into.
    pub zone_id: Option<ZoneId>,
    /// Time the ping was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Insert payload for a location ping.
#[derive(Debug, Clone)]
pub struct NewLocation {
    /// Pre-generated identifier.
    pub id: LocationId,
    /// Reporting participant.
    pub participant_id: ParticipantId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Reported accuracy in meters.
    pub accuracy: Option<f64>,
    /// Classified zone.
    pub zone_id: Option<ZoneId>,
    /// Requested timestamp. Stores may raise it to keep per-participant
    /// timestamps non-decreasing.
    pub timestamp: DateTime<Utc>,
}

impl NewLocation {
    /// Materializes the stored row with the final timestamp.
    #[must_use]
    pub fn into_location(self, timestamp: DateTime<Utc>) -> ParticipantLocation {
        ParticipantLocation {
            id: self.id,
            participant_id: self.participant_id,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            zone_id: self.zone_id,
            timestamp,
        }
    }
}

/// Zone annotation attached to a broadcast update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedZone {
    /// Zone identifier.
    pub id: ZoneId,
    /// Zone name.
    pub name: String,
    /// Risk level at classification time.
    pub risk_level: RiskLevel,
}

impl From<&Zone> for ResolvedZone {
    fn from(zone: &Zone) -> Self {
        Self {
            id: zone.id,
            name: zone.name.clone(),
            risk_level: zone.risk_level,
        }
    }
}

/// Real-time location update delivered to subscribers of one event.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    /// Event channel the update belongs to.
    pub event_id: EventId,
    /// Participant record that reported the ping.
    pub participant_id: ParticipantId,
    /// Linked user id if any, otherwise the participant id.
    pub participant_or_user_id: uuid::Uuid,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Zone the point fell into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_zone: Option<ResolvedZone>,
    /// Time the ping was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Notification port the location pipeline calls after a ping is stored.
///
/// Delivery is best effort: implementations must not block and must not
/// report failures back to the caller.
pub trait LocationNotifier: Send + Sync + fmt::Debug {
    /// Hands an update to the transport.
    fn notify(&self, update: LocationUpdate);
}
