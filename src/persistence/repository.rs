//! Repository traits consumed by the service layer.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::OwnershipGuard;
use crate::domain::{
    Event, EventChanges, EventId, EventStatus, NewEvent, NewLocation, NewParticipant, NewReport,
    NewUser, NewZone, Participant, ParticipantId, ParticipantLocation, Report, ReportFilter,
    ReportId, ReportPriority, ReportStatus, RiskLevel, Role, User, UserId, Zone, ZoneChanges,
    ZoneId,
};
use crate::error::ApiError;

/// Offset/limit window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Rows to skip.
    pub offset: u32,
    /// Maximum rows to return.
    pub limit: u32,
}

/// Filters for event listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventQuery {
    /// Only events in this status.
    pub status: Option<EventStatus>,
    /// Only events organized by this user.
    pub organizer_id: Option<UserId>,
}

/// User account storage.
#[async_trait]
pub trait UserRepository: Send + Sync + fmt::Debug {
    /// Stores a new user.
    ///
    /// # Errors
    ///
    /// [`ApiError::Conflict`] if the email is already registered.
    async fn insert(&self, user: NewUser) -> Result<User, ApiError>;

    /// Loads a user by id.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, ApiError>;

    /// Loads a user by lower-cased email.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;

    /// Lists users newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn list(&self, page: Page) -> Result<(Vec<User>, u64), ApiError>;

    /// Updates name and/or phone. Returns `None` if the user is missing.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn update_profile(
        &self,
        id: UserId,
        name: Option<String>,
        phone: Option<String>,
    ) -> Result<Option<User>, ApiError>;

    /// Replaces the password hash. Returns `false` if the user is missing.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn update_password(&self, id: UserId, password_hash: String) -> Result<bool, ApiError>;

    /// Changes the role. Returns `None` if the user is missing.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn update_role(&self, id: UserId, role: Role) -> Result<Option<User>, ApiError>;

    /// Deletes a user. Returns `false` if the user is missing.
    ///
    /// # Errors
    ///
    /// [`ApiError::Conflict`] while the user still organizes events.
    async fn delete(&self, id: UserId) -> Result<bool, ApiError>;
}

/// Event storage.
#[async_trait]
pub trait EventRepository: Send + Sync + fmt::Debug {
    /// Stores a new event in DRAFT.
    ///
    /// # Errors
    ///
    /// [`ApiError::Conflict`] if the join code is taken.
    async fn insert(&self, event: NewEvent) -> Result<Event, ApiError>;

    /// Loads an event by id.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, ApiError>;

    /// Loads an event by join code.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn find_by_join_code(&self, code: &str) -> Result<Option<Event>, ApiError>;

    /// Lists events ordered by start date, with the total count.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn list(&self, query: EventQuery, page: Page) -> Result<(Vec<Event>, u64), ApiError>;

    /// PUBLISHED events starting at or after `now`, earliest first.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn find_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Event>, ApiError>;

    /// ONGOING events with `now` inside `[start, end]`, earliest first.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn find_ongoing(&self, now: DateTime<Utc>) -> Result<Vec<Event>, ApiError>;

    /// Applies `changes` if the event exists, `guard` permits its organizer
    /// and (when given) its status equals `from_status`, as one atomic
    /// write. Returns `None` when nothing matched.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn update_guarded(
        &self,
        id: EventId,
        guard: OwnershipGuard,
        from_status: Option<EventStatus>,
        changes: &EventChanges,
    ) -> Result<Option<Event>, ApiError>;

    /// Deletes the event (and everything it owns) if `guard` permits.
    /// Returns `false` when nothing matched.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn delete_guarded(&self, id: EventId, guard: OwnershipGuard) -> Result<bool, ApiError>;
}

/// Event membership storage.
#[async_trait]
pub trait ParticipantRepository: Send + Sync + fmt::Debug {
    /// Joins a device to an event in one atomic upsert.
    ///
    /// Creates an active record, reactivates an inactive one, or returns an
    /// active one unchanged. Returns `None` if the event is missing or not
    /// in a joinable status.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn join(&self, participant: NewParticipant) -> Result<Option<Participant>, ApiError>;

    /// Loads a participant by id.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn find_by_id(&self, id: ParticipantId) -> Result<Option<Participant>, ApiError>;

    /// Marks a participant inactive. Returns `None` if missing.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn deactivate(&self, id: ParticipantId) -> Result<Option<Participant>, ApiError>;

    /// Moves `last_seen_at` forward to `at`. Returns `None` if missing.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn touch(
        &self,
        id: ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<Option<Participant>, ApiError>;

    /// Number of active participants of an event.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn count_active(&self, event_id: EventId) -> Result<u64, ApiError>;

    /// Participants of an event in join order.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn list_by_event(
        &self,
        event_id: EventId,
        active_only: bool,
    ) -> Result<Vec<Participant>, ApiError>;
}

/// Zone storage.
#[async_trait]
pub trait ZoneRepository: Send + Sync + fmt::Debug {
    /// Stores a zone if its event exists and `guard` permits the event's
    /// organizer. Returns `None` otherwise.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn insert_guarded(
        &self,
        zone: NewZone,
        guard: OwnershipGuard,
    ) -> Result<Option<Zone>, ApiError>;

    /// Loads a zone by id.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, ApiError>;

    /// Zones of an event in creation order.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn list_by_event(&self, event_id: EventId) -> Result<Vec<Zone>, ApiError>;

    /// Zones of an event at one risk level, in creation order.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn list_by_risk(
        &self,
        event_id: EventId,
        risk_level: RiskLevel,
    ) -> Result<Vec<Zone>, ApiError>;

    /// Applies `changes` if the zone exists and `guard` permits its event's
    /// organizer. Returns `None` when nothing matched.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn update_guarded(
        &self,
        id: ZoneId,
        guard: OwnershipGuard,
        changes: &ZoneChanges,
    ) -> Result<Option<Zone>, ApiError>;

    /// Deletes the zone if `guard` permits. Returns `false` when nothing
    /// matched.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn delete_guarded(&self, id: ZoneId, guard: OwnershipGuard) -> Result<bool, ApiError>;
}

/// Location ping storage. Rows are never updated.
#[async_trait]
pub trait LocationRepository: Send + Sync + fmt::Debug {
    /// Appends a ping. The stored timestamp is raised to the participant's
    /// latest ping if needed, so timestamps never go backwards.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the participant does not exist.
    async fn insert(&self, location: NewLocation) -> Result<ParticipantLocation, ApiError>;

    /// Appends many pings, silently skipping rows whose participant is
    /// missing or whose id already exists. Returns the number stored.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn insert_batch(&self, locations: Vec<NewLocation>) -> Result<u64, ApiError>;

    /// Most recent ping of every active participant of an event.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn latest_by_event(&self, event_id: EventId)
    -> Result<Vec<ParticipantLocation>, ApiError>;

    /// Distinct participants with a ping in `zone_id` at or after `since`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn count_participants_in_zone_since(
        &self,
        zone_id: ZoneId,
        since: DateTime<Utc>,
    ) -> Result<u64, ApiError>;

    /// A participant's pings, newest first.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn history(
        &self,
        participant_id: ParticipantId,
        limit: u32,
    ) -> Result<Vec<ParticipantLocation>, ApiError>;

    /// Deletes pings recorded before `cutoff`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, ApiError>;
}

/// Incident report storage.
#[async_trait]
pub trait ReportRepository: Send + Sync + fmt::Debug {
    /// Stores a new PENDING report.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the event or participant does not exist.
    async fn insert(&self, report: NewReport) -> Result<Report, ApiError>;

    /// Loads a report by id.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn find_by_id(&self, id: ReportId) -> Result<Option<Report>, ApiError>;

    /// Reports of an event, newest first.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn list_by_event(
        &self,
        event_id: EventId,
        filter: ReportFilter,
    ) -> Result<Vec<Report>, ApiError>;

    /// Sets the status. Returns `None` if missing.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn update_status(
        &self,
        id: ReportId,
        status: ReportStatus,
    ) -> Result<Option<Report>, ApiError>;

    /// Sets the priority. Returns `None` if missing.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn update_priority(
        &self,
        id: ReportId,
        priority: ReportPriority,
    ) -> Result<Option<Report>, ApiError>;

    /// Deletes a report. Returns `false` if missing.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    async fn delete(&self, id: ReportId) -> Result<bool, ApiError>;
}
