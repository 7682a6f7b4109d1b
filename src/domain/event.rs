//! Events and their lifecycle state machine.
//!
//! ```text
//!            publish (guarded: DRAFT only)
//!   DRAFT ───────────────────────────────▶ PUBLISHED
//!     │                                        │
//!     └──────── start (any state) ─────────────┴──▶ ONGOING
//!     └──────── complete (any state) ─────────────▶ COMPLETED
//!     └──────── generic update (status field) ────▶ CANCELLED
//! ```
//!
//! `start` and `complete` carry no source-state precondition; only
//! `publish` is guarded.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, ParseEnumError, UserId};

/// Join codes avoid look-alike characters (0/O, 1/I).
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of generated join codes.
pub const JOIN_CODE_LEN: usize = 8;

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Being prepared; invisible to participants.
    Draft,
    /// Announced; participants may join.
    Published,
    /// Running; participants may join.
    Ongoing,
    /// Finished.
    Completed,
    /// Called off.
    Cancelled,
}

impl EventStatus {
    /// Statuses in which participants may join.
    pub const JOINABLE: [Self; 2] = [Self::Published, Self::Ongoing];

    /// Canonical upper-case name, as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Ongoing => "ONGOING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns `true` if participants may join in this status.
    #[must_use]
    pub const fn accepts_participants(self) -> bool {
        matches!(self, Self::Published | Self::Ongoing)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "PUBLISHED" => Ok(Self::Published),
            "ONGOING" => Ok(Self::Ongoing),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ParseEnumError::new("event status", other)),
        }
    }
}

/// Dedicated lifecycle transitions exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTransition {
    /// DRAFT → PUBLISHED.
    Publish,
    /// any → ONGOING.
    Start,
    /// any → COMPLETED.
    Complete,
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {transition} an event in status {current}; it must be {required}")]
pub struct TransitionError {
    /// Verb of the attempted transition.
    pub transition: &'static str,
    /// Status the event was in.
    pub current: EventStatus,
    /// Status the transition requires.
    pub required: EventStatus,
}

impl EventTransition {
    /// Status the event ends up in.
    #[must_use]
    pub const fn target(self) -> EventStatus {
        match self {
            Self::Publish => EventStatus::Published,
            Self::Start => EventStatus::Ongoing,
            Self::Complete => EventStatus::Completed,
        }
    }

    /// Source status the transition is restricted to, if any.
    #[must_use]
    pub const fn required_source(self) -> Option<EventStatus> {
        match self {
            Self::Publish => Some(EventStatus::Draft),
            Self::Start | Self::Complete => None,
        }
    }

    /// Lower-case verb used in logs and messages.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Start => "start",
            Self::Complete => "complete",
        }
    }

    /// Computes the next status from `current`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the transition is guarded and
    /// `current` is not the required source status.
    pub fn apply(self, current: EventStatus) -> Result<EventStatus, TransitionError> {
        match self.required_source() {
            Some(required) if required != current => Err(TransitionError {
                transition: self.verb(),
                current,
                required,
            }),
            _ => Ok(self.target()),
        }
    }
}

/// An event, owned by exactly one organizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Owning organizer.
    pub organizer_id: UserId,
    /// Display name.
    pub name: String,
    /// Free-form description.
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
    /// Optional participant cap.
    pub max_capacity: Option<i32>,
    /// Unique short code participants use to find the event.
    pub join_code: String,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Returns `true` if `now` falls inside `[start_date, end_date]`.
    #[must_use]
    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }
}

/// Insert payload for a new event. Always created in DRAFT.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Pre-generated identifier.
    pub id: EventId,
    /// Owning organizer.
    pub organizer_id: UserId,
    /// Display name.
    pub name: String,
    /// Free-form description.
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
    /// Optional participant cap.
    pub max_capacity: Option<i32>,
    /// Unique join code.
    pub join_code: String,
}

/// Partial update of an event. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New start.
    pub start_date: Option<DateTime<Utc>>,
    /// New end.
    pub end_date: Option<DateTime<Utc>>,
    /// New venue name.
    pub location_name: Option<String>,
    /// New venue latitude.
    pub latitude: Option<f64>,
    /// New venue longitude.
    pub longitude: Option<f64>,
    /// New participant cap.
    pub max_capacity: Option<i32>,
    /// New status.
    pub status: Option<EventStatus>,
}

impl EventChanges {
    /// A change that only moves the event to `status`.
    #[must_use]
    pub fn status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Applies the changes to an in-memory event.
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(name) = &self.name {
            event.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(start) = self.start_date {
            event.start_date = start;
        }
        if let Some(end) = self.end_date {
            event.end_date = end;
        }
        if let Some(location_name) = &self.location_name {
            event.location_name.clone_from(location_name);
        }
        if let Some(latitude) = self.latitude {
            event.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            event.longitude = longitude;
        }
        if let Some(cap) = self.max_capacity {
            event.max_capacity = Some(cap);
        }
        if let Some(status) = self.status {
            event.status = status;
        }
    }
}

/// Generates a random join code of [`JOIN_CODE_LEN`] characters.
#[must_use]
pub fn generate_join_code() -> String {
    let mut rng = rand::thread_rng();
    (0..JOIN_CODE_LEN)
        .filter_map(|_| JOIN_CODE_ALPHABET.choose(&mut rng).map(|b| char::from(*b)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const ALL: [EventStatus; 5] = [
        EventStatus::Draft,
        EventStatus::Published,
        EventStatus::Ongoing,
        EventStatus::Completed,
        EventStatus::Cancelled,
    ];

    #[test]
    fn publish_only_from_draft() {
        for status in ALL {
            let result = EventTransition::Publish.apply(status);
            if status == EventStatus::Draft {
                assert_eq!(result, Ok(EventStatus::Published));
            } else {
                let Err(err) = result else {
                    panic!("publish from {status} must fail");
                };
                assert_eq!(err.current, status);
                assert_eq!(err.required, EventStatus::Draft);
            }
        }
    }

    #[test]
    fn start_and_complete_are_unconditional() {
        for status in ALL {
            assert_eq!(
                EventTransition::Start.apply(status),
                Ok(EventStatus::Ongoing)
            );
            assert_eq!(
                EventTransition::Complete.apply(status),
                Ok(EventStatus::Completed)
            );
        }
    }

    #[test]
    fn only_published_and_ongoing_accept_participants() {
        for status in ALL {
            assert_eq!(
                status.accepts_participants(),
                EventStatus::JOINABLE.contains(&status)
            );
        }
    }

    #[test]
    fn status_string_round_trip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<EventStatus>().ok(), Some(status));
        }
    }

    #[test]
    fn join_code_shape() {
        let code = generate_join_code();
        assert_eq!(code.len(), JOIN_CODE_LEN);
        assert!(code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn transition_error_message() {
        let Err(err) = EventTransition::Publish.apply(EventStatus::Ongoing) else {
            panic!("expected error");
        };
        assert_eq!(
            err.to_string(),
            "cannot publish an event in status ONGOING; it must be DRAFT"
        );
    }
}
