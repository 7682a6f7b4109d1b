//! Database row models and their conversion into domain types.
//!
//! Enum columns are stored as `TEXT` holding the canonical upper-case
//! variant name; a value that fails to parse surfaces as
//! [`ApiError::Internal`].

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{
    Event, GeoPoint, Participant, ParticipantLocation, Report, User, Zone,
};
use crate::error::ApiError;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    /// Primary key.
    pub id: Uuid,
    /// Unique, lower-cased email.
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: Option<String>,
    /// Role name.
    pub role: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = ApiError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            phone: row.phone,
            role: row.role.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning organizer.
    pub organizer_id: Uuid,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Scheduled start.
    pub start_date: DateTime<Utc>,
    /// Scheduled end.
    pub end_date: DateTime<Utc>,
    /// Venue name.
    pub location_name: String,
    /// Venue latitude.
    pub latitude: f64,
    /// Venue longitude.
    pub longitude: f64,
    /// Participant cap.
    pub max_capacity: Option<i32>,
    /// Unique join code.
    pub join_code: String,
    /// Status name.
    pub status: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = ApiError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            organizer_id: row.organizer_id.into(),
            name: row.name,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            location_name: row.location_name,
            latitude: row.latitude,
            longitude: row.longitude,
            max_capacity: row.max_capacity,
            join_code: row.join_code,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `participants` table.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantRow {
    /// Primary key.
    pub id: Uuid,
    /// Joined event.
    pub event_id: Uuid,
    /// Device identifier.
    pub device_id: String,
    /// Linked user.
    pub user_id: Option<Uuid>,
    /// Display name.
    pub name: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Active flag.
    pub is_active: bool,
    /// First join.
    pub joined_at: DateTime<Utc>,
    /// Last activity.
    pub last_seen_at: DateTime<Utc>,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Self {
            id: row.id.into(),
            event_id: row.event_id.into(),
            device_id: row.device_id,
            user_id: row.user_id.map(Into::into),
            name: row.name,
            phone: row.phone,
            is_active: row.is_active,
            joined_at: row.joined_at,
            last_seen_at: row.last_seen_at,
        }
    }
}

/// A row from the `zones` table.
#[derive(Debug, Clone, FromRow)]
pub struct ZoneRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning event.
    pub event_id: Uuid,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Boundary vertices as JSONB.
    pub polygon: Json<Vec<GeoPoint>>,
    /// Risk level name.
    pub risk_level: String,
    /// Head-count capacity.
    pub capacity: Option<i32>,
    /// Display color.
    pub color: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ZoneRow> for Zone {
    type Error = ApiError;

    fn try_from(row: ZoneRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            event_id: row.event_id.into(),
            name: row.name,
            description: row.description,
            polygon: row.polygon.0,
            risk_level: row.risk_level.parse()?,
            capacity: row.capacity,
            color: row.color,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `participant_locations` table.
#[derive(Debug, Clone, FromRow)]
pub struct LocationRow {
    /// Primary key.
    pub id: Uuid,
    /// Reporting participant.
    pub participant_id: Uuid,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Accuracy in meters.
    pub accuracy: Option<f64>,
    /// Classified zone.
    pub zone_id: Option<Uuid>,
    /// Recording time.
    pub recorded_at: DateTime<Utc>,
}

impl From<LocationRow> for ParticipantLocation {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id.into(),
            participant_id: row.participant_id.into(),
            latitude: row.latitude,
            longitude: row.longitude,
            accuracy: row.accuracy,
            zone_id: row.zone_id.map(Into::into),
            timestamp: row.recorded_at,
        }
    }
}

/// A row from the `reports` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReportRow {
    /// Primary key.
    pub id: Uuid,
    /// Event.
    pub event_id: Uuid,
    /// Reporting participant.
    pub participant_id: Option<Uuid>,
    /// Reporting user.
    pub user_id: Option<Uuid>,
    /// Headline.
    pub title: Option<String>,
    /// Description.
    pub message: String,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// Status name.
    pub status: String,
    /// Priority name.
    pub priority: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for Report {
    type Error = ApiError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            event_id: row.event_id.into(),
            participant_id: row.participant_id.map(Into::into),
            user_id: row.user_id.map(Into::into),
            title: row.title,
            message: row.message,
            latitude: row.latitude,
            longitude: row.longitude,
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Converts a batch of rows, failing on the first malformed one.
///
/// # Errors
///
/// Returns the first conversion error.
pub fn convert_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, ApiError>
where
    T: TryFrom<R, Error = ApiError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn unknown_enum_value_is_internal_error() {
        let row = UserRow {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: "h".into(),
            name: "A".into(),
            phone: None,
            role: "ROOT".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let Err(err) = User::try_from(row) else {
            panic!("unknown role must not convert");
        };
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn zone_row_unwraps_polygon() {
        let polygon = vec![
            GeoPoint { latitude: 0.0, longitude: 0.0 },
            GeoPoint { latitude: 0.0, longitude: 1.0 },
            GeoPoint { latitude: 1.0, longitude: 1.0 },
        ];
        let row = ZoneRow {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: "stage".into(),
            description: None,
            polygon: Json(polygon.clone()),
            risk_level: "HIGH".into(),
            capacity: Some(100),
            color: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let Ok(zone) = Zone::try_from(row) else {
            panic!("valid row must convert");
        };
        assert_eq!(zone.polygon, polygon);
        assert_eq!(zone.risk_level, crate::domain::RiskLevel::High);
    }
}
