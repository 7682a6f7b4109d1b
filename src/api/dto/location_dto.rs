//! Location ingestion and query DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{LocationId, ParticipantId, ParticipantLocation, ZoneId};
use crate::service::LocationInput;

/// One location ping, used by `POST /locations` and in batches.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    /// Reporting participant.
    pub participant_id: ParticipantId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Device-side capture time; defaults to server time.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<LocationRequest> for LocationInput {
    fn from(req: LocationRequest) -> Self {
        Self {
            participant_id: req.participant_id,
            latitude: req.latitude,
            longitude: req.longitude,
            accuracy: req.accuracy,
            timestamp: req.timestamp,
        }
    }
}

/// Request body for `POST /locations/batch`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchLocationRequest {
    /// Pings to store. No live updates are broadcast for these.
    pub locations: Vec<LocationRequest>,
}

/// Stored location record.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationDto {
    /// Record identifier.
    pub id: LocationId,
    /// Reporting participant.
    pub participant_id: ParticipantId,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Accuracy in meters.
    pub accuracy: Option<f64>,
    /// Zone the point fell into when stored.
    pub zone_id: Option<ZoneId>,
    /// Stored timestamp.
    pub timestamp: DateTime<Utc>,
}

impl From<ParticipantLocation> for LocationDto {
    fn from(loc: ParticipantLocation) -> Self {
        Self {
            id: loc.id,
            participant_id: loc.participant_id,
            latitude: loc.latitude,
            longitude: loc.longitude,
            accuracy: loc.accuracy,
            zone_id: loc.zone_id,
            timestamp: loc.timestamp,
        }
    }
}

/// Response body for `POST /locations/batch`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResult {
    /// Number of pings persisted.
    pub stored: u64,
}

/// Response body for `DELETE /locations/cleanup`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CleanupResult {
    /// Number of records removed.
    pub deleted: u64,
}

/// Query parameters for `GET /participants/{id}/locations`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Maximum records (default 100, max 1000).
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Query parameters for `DELETE /locations/cleanup`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CleanupParams {
    /// Remove records older than this many days.
    pub days: u32,
}

/// Query parameters for `GET /zones/{id}/density`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DensityParams {
    /// Trailing window in minutes (default 5).
    #[serde(default)]
    pub minutes: Option<u32>,
}
