//! Event creation, queries and the permission-gated lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::ORGANIZER_OR_ADMIN;
use crate::domain::event::generate_join_code;
use crate::domain::{
    Actor, Event, EventChanges, EventId, EventStatus, EventTransition, NewEvent,
};
use crate::error::ApiError;
use crate::persistence::{EventQuery, EventRepository, OwnershipGuard, Page};

use super::FieldChecks;

/// Attempts at finding an unused join code before giving up.
const JOIN_CODE_ATTEMPTS: usize = 5;

/// Input for [`EventService::create`].
#[derive(Debug, Clone)]
pub struct CreateEvent {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Scheduled start.
    pub start_date: DateTime<Utc>,
    /// Scheduled end; must be after the start.
    pub end_date: DateTime<Utc>,
    /// Venue name.
    pub location_name: String,
    /// Venue latitude.
    pub latitude: f64,
    /// Venue longitude.
    pub longitude: f64,
    /// Optional positive participant cap.
    pub max_capacity: Option<i32>,
}

/// Input for [`EventService::update`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateEvent {
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
    /// New status. Only CANCELLED is accepted here; the other states are
    /// reached through [`EventService::transition`].
    pub status: Option<EventStatus>,
}

/// Event lifecycle management.
#[derive(Debug, Clone)]
pub struct EventService {
    events: Arc<dyn EventRepository>,
}

impl EventService {
    /// Creates the service.
    #[must_use]
    pub fn new(events: Arc<dyn EventRepository>) -> Self {
        Self { events }
    }

    /// Creates a DRAFT event owned by the caller with a fresh join code.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Forbidden`] unless EVENT_ORGANIZER or SUPER_ADMIN.
    /// - [`ApiError::Validation`] for invalid fields.
    /// - [`ApiError::Conflict`] if no unused join code was found.
    pub async fn create(&self, actor: &Actor, input: CreateEvent) -> Result<Event, ApiError> {
        actor.require_any(ORGANIZER_OR_ADMIN)?;
        FieldChecks::new()
            .not_blank(&input.name, "name")
            .not_blank(&input.location_name, "locationName")
            .require(
                input.end_date > input.start_date,
                "endDate",
                "must be after startDate",
            )
            .latitude(input.latitude, "latitude")
            .longitude(input.longitude, "longitude")
            .require(
                input.max_capacity.is_none_or(|cap| cap > 0),
                "maxCapacity",
                "must be positive",
            )
            .finish()?;

        let mut last_err = None;
        for _ in 0..JOIN_CODE_ATTEMPTS {
            let new_event = NewEvent {
                id: EventId::new(),
                organizer_id: actor.user_id,
                name: input.name.trim().to_string(),
                description: input.description.clone(),
                start_date: input.start_date,
                end_date: input.end_date,
                location_name: input.location_name.trim().to_string(),
                latitude: input.latitude,
                longitude: input.longitude,
                max_capacity: input.max_capacity,
                join_code: generate_join_code(),
            };
            match self.events.insert(new_event).await {
                Ok(event) => {
                    tracing::info!(
                        event_id = %event.id,
                        organizer_id = %event.organizer_id,
                        join_code = %event.join_code,
                        "event created"
                    );
                    return Ok(event);
                }
                Err(ApiError::Conflict(msg)) => {
                    tracing::warn!(%msg, "join code collision, retrying");
                    last_err = Some(ApiError::Conflict(msg));
                }
                Err(other) => return Err(other),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            ApiError::Conflict("could not allocate a join code".to_string())
        }))
    }

    /// Loads an event.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if missing.
    pub async fn get(&self, id: EventId) -> Result<Event, ApiError> {
        self.events
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("event", id))
    }

    /// Loads an event by join code (case-insensitive).
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if no event has the code.
    pub async fn get_by_join_code(&self, code: &str) -> Result<Event, ApiError> {
        let code = code.trim().to_uppercase();
        self.events
            .find_by_join_code(&code)
            .await?
            .ok_or_else(|| ApiError::not_found("event with join code", code))
    }

    /// Lists events by start date, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn list(
        &self,
        status: Option<EventStatus>,
        page: Page,
    ) -> Result<(Vec<Event>, u64), ApiError> {
        let query = EventQuery {
            status,
            organizer_id: None,
        };
        self.events.list(query, page).await
    }

    /// Events organized by the caller.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless EVENT_ORGANIZER or SUPER_ADMIN.
    pub async fn mine(&self, actor: &Actor, page: Page) -> Result<(Vec<Event>, u64), ApiError> {
        actor.require_any(ORGANIZER_OR_ADMIN)?;
        let query = EventQuery {
            status: None,
            organizer_id: Some(actor.user_id),
        };
        self.events.list(query, page).await
    }

    /// PUBLISHED events that have not started yet.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn upcoming(&self) -> Result<Vec<Event>, ApiError> {
        self.events.find_upcoming(Utc::now()).await
    }

    /// ONGOING events whose schedule covers the current time.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn ongoing(&self) -> Result<Vec<Event>, ApiError> {
        self.events.find_ongoing(Utc::now()).await
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] for invalid fields, or a status other
    ///   than CANCELLED.
    /// - [`ApiError::NotFound`] if the event is missing.
    /// - [`ApiError::Forbidden`] unless the caller organizes the event or
    ///   is SUPER_ADMIN.
    pub async fn update(
        &self,
        actor: &Actor,
        id: EventId,
        input: UpdateEvent,
    ) -> Result<Event, ApiError> {
        actor.require_any(ORGANIZER_OR_ADMIN)?;
        let mut checks = FieldChecks::new();
        if let Some(name) = &input.name {
            checks.not_blank(name, "name");
        }
        if let Some(location_name) = &input.location_name {
            checks.not_blank(location_name, "locationName");
        }
        if let Some(lat) = input.latitude {
            checks.latitude(lat, "latitude");
        }
        if let Some(lng) = input.longitude {
            checks.longitude(lng, "longitude");
        }
        checks.require(
            input.max_capacity.is_none_or(|cap| cap > 0),
            "maxCapacity",
            "must be positive",
        );
        checks.require(
            input.status.is_none_or(|s| s == EventStatus::Cancelled),
            "status",
            "only CANCELLED can be set directly; use publish, start or complete",
        );
        if input.start_date.is_some() || input.end_date.is_some() {
            let current = self.get(id).await?;
            let start = input.start_date.unwrap_or(current.start_date);
            let end = input.end_date.unwrap_or(current.end_date);
            checks.require(end > start, "endDate", "must be after startDate");
        }
        checks.finish()?;

        let changes = EventChanges {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
            start_date: input.start_date,
            end_date: input.end_date,
            location_name: input.location_name.map(|n| n.trim().to_string()),
            latitude: input.latitude,
            longitude: input.longitude,
            max_capacity: input.max_capacity,
            status: input.status,
        };
        let guard = OwnershipGuard::for_actor(actor, &[]);
        match self.events.update_guarded(id, guard, None, &changes).await? {
            Some(event) => {
                tracing::info!(event_id = %id, status = %event.status, "event updated");
                Ok(event)
            }
            None => Err(self.explain_miss(id, guard, None).await),
        }
    }

    /// Deletes an event together with its zones, participants, locations
    /// and reports.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] or [`ApiError::Forbidden`] as for
    /// [`update`](Self::update).
    pub async fn delete(&self, actor: &Actor, id: EventId) -> Result<(), ApiError> {
        actor.require_any(ORGANIZER_OR_ADMIN)?;
        let guard = OwnershipGuard::for_actor(actor, &[]);
        if self.events.delete_guarded(id, guard).await? {
            tracing::info!(event_id = %id, by = %actor.user_id, "event deleted");
            Ok(())
        } else {
            Err(self.explain_miss(id, guard, None).await)
        }
    }

    /// Moves the event through a lifecycle transition.
    ///
    /// The ownership check, the source-state check and the write are one
    /// conditional statement.
    ///
    /// # Errors
    ///
    /// - [`ApiError::NotFound`] if the event is missing.
    /// - [`ApiError::Forbidden`] unless owner or SUPER_ADMIN.
    /// - [`ApiError::BadRequest`] if the transition is not allowed from the
    ///   current status (publish outside DRAFT).
    pub async fn transition(
        &self,
        actor: &Actor,
        id: EventId,
        transition: EventTransition,
    ) -> Result<Event, ApiError> {
        actor.require_any(ORGANIZER_OR_ADMIN)?;
        let guard = OwnershipGuard::for_actor(actor, &[]);
        let changes = EventChanges::status(transition.target());
        let updated = self
            .events
            .update_guarded(id, guard, transition.required_source(), &changes)
            .await?;
        match updated {
            Some(event) => {
                tracing::info!(
                    event_id = %id,
                    transition = transition.verb(),
                    status = %event.status,
                    "event transitioned"
                );
                Ok(event)
            }
            None => Err(self.explain_miss(id, guard, Some(transition)).await),
        }
    }

    /// Works out why a conditional write matched nothing. Read-only.
    async fn explain_miss(
        &self,
        id: EventId,
        guard: OwnershipGuard,
        transition: Option<EventTransition>,
    ) -> ApiError {
        let event = match self.events.find_by_id(id).await {
            Ok(Some(event)) => event,
            Ok(None) => return ApiError::not_found("event", id),
            Err(err) => return err,
        };
        if !guard.permits(event.organizer_id) {
            return ApiError::Forbidden("only the organizer or an admin may modify this event".into());
        }
        match transition.map(|t| t.apply(event.status)) {
            Some(Err(rejected)) => ApiError::BadRequest(rejected.to_string()),
            _ => ApiError::Conflict(format!("event {id} changed concurrently; retry")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;
    use tokio_test::assert_ok;

    use super::*;
    use crate::domain::{NewUser, Role, UserId};
    use crate::persistence::Repositories;

    struct Fixture {
        service: EventService,
        organizer: Actor,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::in_memory();
        let organizer = Actor {
            user_id: UserId::new(),
            role: Role::EventOrganizer,
        };
        assert_ok!(
            repos
                .users
                .insert(NewUser {
                    id: organizer.user_id,
                    email: "org@example.com".into(),
                    password_hash: "hash".into(),
                    name: "Org".into(),
                    phone: None,
                    role: Role::EventOrganizer,
                })
                .await
        );
        Fixture {
            service: EventService::new(repos.events),
            organizer,
        }
    }

    fn create_input() -> CreateEvent {
        let now = Utc::now();
        CreateEvent {
            name: "Summer Fest".into(),
            description: None,
            start_date: now + Duration::hours(1),
            end_date: now + Duration::hours(2),
            location_name: "Main Park".into(),
            latitude: 10.0,
            longitude: 20.0,
            max_capacity: Some(500),
        }
    }

    #[tokio::test]
    async fn create_starts_in_draft_with_join_code() {
        let f = fixture().await;
        let event = assert_ok!(f.service.create(&f.organizer, create_input()).await);
        assert_eq!(event.status, EventStatus::Draft);
        assert_eq!(event.join_code.len(), 8);
        assert_eq!(event.organizer_id, f.organizer.user_id);

        let by_code = assert_ok!(
            f.service
                .get_by_join_code(&event.join_code.to_lowercase())
                .await
        );
        assert_eq!(by_code.id, event.id);
    }

    #[tokio::test]
    async fn participants_cannot_create_events() {
        let f = fixture().await;
        let participant = Actor {
            user_id: UserId::new(),
            role: Role::Participant,
        };
        let result = f.service.create(&participant, create_input()).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn create_rejects_inverted_schedule() {
        let f = fixture().await;
        let mut input = create_input();
        input.end_date = input.start_date - Duration::minutes(1);
        let Err(ApiError::Validation(errors)) = f.service.create(&f.organizer, input).await else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.first().and_then(|e| e.field.as_deref()), Some("endDate"));
    }

    #[tokio::test]
    async fn publish_only_once() {
        let f = fixture().await;
        let event = assert_ok!(f.service.create(&f.organizer, create_input()).await);

        let published = assert_ok!(
            f.service
                .transition(&f.organizer, event.id, EventTransition::Publish)
                .await
        );
        assert_eq!(published.status, EventStatus::Published);

        let again = f
            .service
            .transition(&f.organizer, event.id, EventTransition::Publish)
            .await;
        assert!(matches!(again, Err(ApiError::BadRequest(_))));
        let current = assert_ok!(f.service.get(event.id).await);
        assert_eq!(current.status, EventStatus::Published);
    }

    #[tokio::test]
    async fn start_and_complete_are_unconditional() {
        let f = fixture().await;
        let event = assert_ok!(f.service.create(&f.organizer, create_input()).await);
        let completed = assert_ok!(
            f.service
                .transition(&f.organizer, event.id, EventTransition::Complete)
                .await
        );
        assert_eq!(completed.status, EventStatus::Completed);
        let restarted = assert_ok!(
            f.service
                .transition(&f.organizer, event.id, EventTransition::Start)
                .await
        );
        assert_eq!(restarted.status, EventStatus::Ongoing);
    }

    #[tokio::test]
    async fn other_organizers_are_forbidden_but_admin_is_not() {
        let f = fixture().await;
        let event = assert_ok!(f.service.create(&f.organizer, create_input()).await);
        let stranger = Actor {
            user_id: UserId::new(),
            role: Role::EventOrganizer,
        };
        let denied = f
            .service
            .transition(&stranger, event.id, EventTransition::Publish)
            .await;
        assert!(matches!(denied, Err(ApiError::Forbidden(_))));
        let unchanged = assert_ok!(f.service.get(event.id).await);
        assert_eq!(unchanged.status, EventStatus::Draft);

        let admin = Actor {
            user_id: UserId::new(),
            role: Role::SuperAdmin,
        };
        assert_ok!(
            f.service
                .transition(&admin, event.id, EventTransition::Publish)
                .await
        );
    }

    #[tokio::test]
    async fn missing_event_is_not_found() {
        let f = fixture().await;
        let result = f
            .service
            .transition(&f.organizer, EventId::new(), EventTransition::Start)
            .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancel_through_generic_update() {
        let f = fixture().await;
        let event = assert_ok!(f.service.create(&f.organizer, create_input()).await);
        let update = UpdateEvent {
            status: Some(EventStatus::Cancelled),
            name: Some("Renamed".into()),
            ..UpdateEvent::default()
        };
        let updated = assert_ok!(f.service.update(&f.organizer, event.id, update).await);
        assert_eq!(updated.status, EventStatus::Cancelled);
        assert_eq!(updated.name, "Renamed");
    }

    #[tokio::test]
    async fn generic_update_cannot_bypass_lifecycle() {
        let f = fixture().await;
        let event = assert_ok!(f.service.create(&f.organizer, create_input()).await);
        assert_ok!(
            f.service
                .transition(&f.organizer, event.id, EventTransition::Complete)
                .await
        );

        for status in [EventStatus::Draft, EventStatus::Published, EventStatus::Ongoing] {
            let update = UpdateEvent {
                status: Some(status),
                ..UpdateEvent::default()
            };
            let Err(ApiError::Validation(errors)) =
                f.service.update(&f.organizer, event.id, update).await
            else {
                panic!("status {status} should be rejected");
            };
            assert_eq!(errors.first().and_then(|e| e.field.as_deref()), Some("status"));
        }
        let current = assert_ok!(f.service.get(event.id).await);
        assert_eq!(current.status, EventStatus::Completed);
    }

    async fn event_at(f: &Fixture, name: &str, start_hours: i64, end_hours: i64) -> Event {
        let now = Utc::now();
        let input = CreateEvent {
            name: name.into(),
            start_date: now + Duration::hours(start_hours),
            end_date: now + Duration::hours(end_hours),
            ..create_input()
        };
        assert_ok!(f.service.create(&f.organizer, input).await)
    }

    async fn moved(f: &Fixture, event: &Event, transition: EventTransition) -> EventId {
        assert_ok!(f.service.transition(&f.organizer, event.id, transition).await);
        event.id
    }

    #[tokio::test]
    async fn upcoming_and_ongoing_filter_and_sort_by_start() {
        let f = fixture().await;
        let later = event_at(&f, "later", 3, 4).await;
        let later = moved(&f, &later, EventTransition::Publish).await;
        let sooner = event_at(&f, "sooner", 1, 2).await;
        let sooner = moved(&f, &sooner, EventTransition::Publish).await;
        let started = event_at(&f, "published but started", -1, 2).await;
        moved(&f, &started, EventTransition::Publish).await;
        event_at(&f, "draft", 1, 2).await;

        let early = event_at(&f, "running since two hours", -2, 1).await;
        let early = moved(&f, &early, EventTransition::Start).await;
        let recent = event_at(&f, "running since one hour", -1, 2).await;
        let recent = moved(&f, &recent, EventTransition::Start).await;
        let over = event_at(&f, "ongoing but over", -3, -1).await;
        moved(&f, &over, EventTransition::Start).await;
        let premature = event_at(&f, "ongoing before start", 1, 2).await;
        moved(&f, &premature, EventTransition::Start).await;

        let upcoming: Vec<EventId> = assert_ok!(f.service.upcoming().await)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(upcoming, vec![sooner, later]);

        let ongoing: Vec<EventId> = assert_ok!(f.service.ongoing().await)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ongoing, vec![early, recent]);
    }

    #[tokio::test]
    async fn update_checks_schedule_against_stored_dates() {
        let f = fixture().await;
        let event = assert_ok!(f.service.create(&f.organizer, create_input()).await);
        let update = UpdateEvent {
            end_date: Some(event.start_date - Duration::hours(1)),
            ..UpdateEvent::default()
        };
        let result = f.service.update(&f.organizer, event.id, update).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn mine_lists_only_own_events() {
        let f = fixture().await;
        assert_ok!(f.service.create(&f.organizer, create_input()).await);
        let page = Page { offset: 0, limit: 20 };
        let (events, total) = assert_ok!(f.service.mine(&f.organizer, page).await);
        assert_eq!(total, 1);
        assert_eq!(events.len(), 1);
        let (all, _) = assert_ok!(f.service.list(Some(EventStatus::Published), page).await);
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_event() {
        let f = fixture().await;
        let event = assert_ok!(f.service.create(&f.organizer, create_input()).await);
        assert_ok!(f.service.delete(&f.organizer, event.id).await);
        assert!(matches!(
            f.service.get(event.id).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
