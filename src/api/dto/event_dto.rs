//! Event DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Event, EventId, EventStatus, UserId};
use crate::service::{CreateEvent, UpdateEvent};

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Event name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Scheduled start.
    pub start_date: DateTime<Utc>,
    /// Scheduled end; must be after `startDate`.
    pub end_date: DateTime<Utc>,
    /// Venue name.
    pub location_name: String,
    /// Venue latitude.
    pub latitude: f64,
    /// Venue longitude.
    pub longitude: f64,
    /// Optional attendance cap (> 0).
    #[serde(default)]
    pub max_capacity: Option<i32>,
}

impl From<CreateEventRequest> for CreateEvent {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
            location_name: req.location_name,
            latitude: req.latitude,
            longitude: req.longitude,
            max_capacity: req.max_capacity,
        }
    }
}

/// Request body for `PATCH /events/{id}`. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New start.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// New end.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// New venue name.
    #[serde(default)]
    pub location_name: Option<String>,
    /// New venue latitude.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// New venue longitude.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// New attendance cap.
    #[serde(default)]
    pub max_capacity: Option<i32>,
    /// Set to CANCELLED to cancel the event; no other status is accepted.
    #[serde(default)]
    pub status: Option<EventStatus>,
}

impl From<UpdateEventRequest> for UpdateEvent {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
            location_name: req.location_name,
            latitude: req.latitude,
            longitude: req.longitude,
            max_capacity: req.max_capacity,
            status: req.status,
        }
    }
}

/// Event representation returned by every event endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    /// Event identifier.
    pub id: EventId,
    /// Organizing user.
    pub organizer_id: UserId,
    /// Event name.
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
    /// Attendance cap.
    pub max_capacity: Option<i32>,
    /// Code participants use to join.
    pub join_code: String,
    /// Lifecycle state.
    pub status: EventStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventDto {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            organizer_id: event.organizer_id,
            name: event.name,
            description: event.description,
            start_date: event.start_date,
            end_date: event.end_date,
            location_name: event.location_name,
            latitude: event.latitude,
            longitude: event.longitude,
            max_capacity: event.max_capacity,
            join_code: event.join_code,
            status: event.status,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Query parameters for `GET /events`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventFilterParams {
    /// Only events in this status.
    #[serde(default)]
    pub status: Option<EventStatus>,
}

/// Response body for `GET /events/{id}/participants/count`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCountDto {
    /// Event the count belongs to.
    pub event_id: EventId,
    /// Currently active participants.
    pub active_participants: u64,
}
