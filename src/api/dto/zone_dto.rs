//! Zone DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{EventId, GeoPoint, RiskLevel, Zone, ZoneChanges, ZoneId};
use crate::service::CreateZone;

/// Request body for `POST /zones`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateZoneRequest {
    /// Owning event.
    pub event_id: EventId,
    /// Zone name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Boundary vertices (at least 3).
    pub polygon: Vec<GeoPoint>,
    /// Initial risk level; defaults to LOW.
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    /// Maximum comfortable occupancy.
    #[serde(default)]
    pub capacity: Option<i32>,
    /// Display color, e.g. `#ff0000`.
    #[serde(default)]
    pub color: Option<String>,
}

impl From<CreateZoneRequest> for CreateZone {
    fn from(req: CreateZoneRequest) -> Self {
        Self {
            event_id: req.event_id,
            name: req.name,
            description: req.description,
            polygon: req.polygon,
            risk_level: req.risk_level,
            capacity: req.capacity,
            color: req.color,
        }
    }
}

/// Request body for `PATCH /zones/{id}`. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateZoneRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New boundary.
    #[serde(default)]
    pub polygon: Option<Vec<GeoPoint>>,
    /// New risk level.
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    /// New capacity.
    #[serde(default)]
    pub capacity: Option<i32>,
    /// New color.
    #[serde(default)]
    pub color: Option<String>,
}

impl From<UpdateZoneRequest> for ZoneChanges {
    fn from(req: UpdateZoneRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            polygon: req.polygon,
            risk_level: req.risk_level,
            capacity: req.capacity,
            color: req.color,
        }
    }
}

/// Request body for `PATCH /zones/{id}/risk-level`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskLevelRequest {
    /// New risk level.
    pub risk_level: RiskLevel,
}

/// Zone representation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDto {
    /// Zone identifier.
    pub id: ZoneId,
    /// Owning event.
    pub event_id: EventId,
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Boundary vertices.
    pub polygon: Vec<GeoPoint>,
    /// Current risk level.
    pub risk_level: RiskLevel,
    /// Capacity.
    pub capacity: Option<i32>,
    /// Display color.
    pub color: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<Zone> for ZoneDto {
    fn from(zone: Zone) -> Self {
        Self {
            id: zone.id,
            event_id: zone.event_id,
            name: zone.name,
            description: zone.description,
            polygon: zone.polygon,
            risk_level: zone.risk_level,
            capacity: zone.capacity,
            color: zone.color,
            created_at: zone.created_at,
            updated_at: zone.updated_at,
        }
    }
}
