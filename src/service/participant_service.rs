//! Joining, leaving and presence tracking.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::SUPERVISORS;
use crate::domain::{Actor, EventId, NewParticipant, Participant, ParticipantId, UserId};
use crate::error::ApiError;
use crate::persistence::{EventRepository, ParticipantRepository};

use super::FieldChecks;

/// Input for [`ParticipantService::join`].
#[derive(Debug, Clone)]
pub struct JoinRequest {
    /// Stable identifier of the joining device.
    pub device_id: String,
    /// Authenticated user, if any.
    pub user_id: Option<UserId>,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional phone number.
    pub phone: Option<String>,
}

/// Event membership management.
#[derive(Debug, Clone)]
pub struct ParticipantService {
    events: Arc<dyn EventRepository>,
    participants: Arc<dyn ParticipantRepository>,
}

impl ParticipantService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventRepository>,
        participants: Arc<dyn ParticipantRepository>,
    ) -> Self {
        Self {
            events,
            participants,
        }
    }

    /// Joins a device to an event.
    ///
    /// Idempotent per `(event, device)`: an active membership is returned
    /// unchanged, an inactive one is reactivated.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] for a blank device id.
    /// - [`ApiError::NotFound`] if the event is missing.
    /// - [`ApiError::BadRequest`] unless the event is PUBLISHED or ONGOING.
    pub async fn join(&self, event_id: EventId, request: JoinRequest) -> Result<Participant, ApiError> {
        FieldChecks::new()
            .not_blank(&request.device_id, "deviceId")
            .finish()?;
        let joined = self
            .participants
            .join(NewParticipant {
                id: ParticipantId::new(),
                event_id,
                device_id: request.device_id.trim().to_string(),
                user_id: request.user_id,
                name: request.name,
                phone: request.phone,
                joined_at: Utc::now(),
            })
            .await?;
        if let Some(participant) = joined {
            tracing::info!(
                %event_id,
                participant_id = %participant.id,
                device_id = %participant.device_id,
                "participant joined"
            );
            return Ok(participant);
        }
        match self.events.find_by_id(event_id).await? {
            None => Err(ApiError::not_found("event", event_id)),
            Some(event) => Err(ApiError::BadRequest(format!(
                "event is not open for joining (status {})",
                event.status
            ))),
        }
    }

    /// Resolves a join code, then joins.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] for an unknown code, otherwise as
    /// [`join`](Self::join).
    pub async fn join_by_code(
        &self,
        join_code: &str,
        request: JoinRequest,
    ) -> Result<Participant, ApiError> {
        let code = join_code.trim().to_uppercase();
        let event = self
            .events
            .find_by_join_code(&code)
            .await?
            .ok_or_else(|| ApiError::not_found("event with join code", &code))?;
        self.join(event.id, request).await
    }

    /// Loads a participant.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if missing.
    pub async fn get(&self, id: ParticipantId) -> Result<Participant, ApiError> {
        self.participants
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("participant", id))
    }

    /// Marks the participant inactive.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if missing.
    pub async fn leave(&self, id: ParticipantId) -> Result<Participant, ApiError> {
        let participant = self
            .participants
            .deactivate(id)
            .await?
            .ok_or_else(|| ApiError::not_found("participant", id))?;
        tracing::info!(participant_id = %id, event_id = %participant.event_id, "participant left");
        Ok(participant)
    }

    /// Refreshes `last_seen_at`.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if missing.
    pub async fn heartbeat(&self, id: ParticipantId) -> Result<Participant, ApiError> {
        self.participants
            .touch(id, Utc::now())
            .await?
            .ok_or_else(|| ApiError::not_found("participant", id))
    }

    /// Number of active participants.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the event is missing.
    pub async fn active_count(&self, event_id: EventId) -> Result<u64, ApiError> {
        self.ensure_event(event_id).await?;
        self.participants.count_active(event_id).await
    }

    /// Participants of an event in join order.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless organizer, security staff or admin;
    /// [`ApiError::NotFound`] if the event is missing.
    pub async fn list(
        &self,
        actor: &Actor,
        event_id: EventId,
        active_only: bool,
    ) -> Result<Vec<Participant>, ApiError> {
        actor.require_any(SUPERVISORS)?;
        self.ensure_event(event_id).await?;
        self.participants.list_by_event(event_id, active_only).await
    }

    async fn ensure_event(&self, event_id: EventId) -> Result<(), ApiError> {
        match self.events.find_by_id(event_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found("event", event_id)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;
    use tokio_test::assert_ok;

    use super::*;
    use crate::domain::{EventChanges, EventStatus, NewEvent, NewUser, Role};
    use crate::persistence::{OwnershipGuard, Repositories};

    async fn setup(status: EventStatus) -> (ParticipantService, Repositories, EventId, String) {
        let repos = Repositories::in_memory();
        let organizer = UserId::new();
        assert_ok!(
            repos
                .users
                .insert(NewUser {
                    id: organizer,
                    email: "org@example.com".into(),
                    password_hash: "hash".into(),
                    name: "Org".into(),
                    phone: None,
                    role: Role::EventOrganizer,
                })
                .await
        );
        let now = Utc::now();
        let event = assert_ok!(
            repos
                .events
                .insert(NewEvent {
                    id: EventId::new(),
                    organizer_id: organizer,
                    name: "Fest".into(),
                    description: None,
                    start_date: now,
                    end_date: now + Duration::hours(3),
                    location_name: "Park".into(),
                    latitude: 0.0,
                    longitude: 0.0,
                    max_capacity: None,
                    join_code: "ABCD2345".into(),
                })
                .await
        );
        if status != EventStatus::Draft {
            assert_ok!(
                repos
                    .events
                    .update_guarded(
                        event.id,
                        OwnershipGuard::unrestricted(),
                        None,
                        &EventChanges::status(status),
                    )
                    .await
            );
        }
        let service = ParticipantService::new(
            Arc::clone(&repos.events),
            Arc::clone(&repos.participants),
        );
        (service, repos, event.id, event.join_code)
    }

    fn request(device: &str) -> JoinRequest {
        JoinRequest {
            device_id: device.into(),
            user_id: None,
            name: Some("Guest".into()),
            phone: None,
        }
    }

    #[tokio::test]
    async fn join_twice_keeps_one_active_membership() {
        let (service, _, event_id, _) = setup(EventStatus::Published).await;
        let first = assert_ok!(service.join(event_id, request("phone-1")).await);
        let second = assert_ok!(service.join(event_id, request("phone-1")).await);
        assert_eq!(first.id, second.id);
        assert_eq!(assert_ok!(service.active_count(event_id).await), 1);
    }

    #[tokio::test]
    async fn leave_then_rejoin_reactivates() {
        let (service, _, event_id, _) = setup(EventStatus::Ongoing).await;
        let joined = assert_ok!(service.join(event_id, request("phone-1")).await);
        let left = assert_ok!(service.leave(joined.id).await);
        assert!(!left.is_active);
        assert_eq!(assert_ok!(service.active_count(event_id).await), 0);

        let back = assert_ok!(service.join(event_id, request("phone-1")).await);
        assert_eq!(back.id, joined.id);
        assert!(back.is_active);
    }

    #[tokio::test]
    async fn draft_and_completed_events_reject_joins() {
        for status in [EventStatus::Draft, EventStatus::Completed, EventStatus::Cancelled] {
            let (service, _, event_id, _) = setup(status).await;
            let result = service.join(event_id, request("phone-1")).await;
            assert!(
                matches!(result, Err(ApiError::BadRequest(_))),
                "status {status} must reject joins"
            );
        }
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let (service, _, _, _) = setup(EventStatus::Published).await;
        let result = service.join(EventId::new(), request("phone-1")).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn join_by_code_is_case_insensitive() {
        let (service, _, event_id, code) = setup(EventStatus::Published).await;
        let joined = assert_ok!(
            service
                .join_by_code(&code.to_lowercase(), request("phone-2"))
                .await
        );
        assert_eq!(joined.event_id, event_id);
        let missing = service.join_by_code("ZZZZZZZZ", request("phone-2")).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn heartbeat_moves_last_seen_forward() {
        let (service, _, event_id, _) = setup(EventStatus::Published).await;
        let joined = assert_ok!(service.join(event_id, request("phone-1")).await);
        let beat = assert_ok!(service.heartbeat(joined.id).await);
        assert!(beat.last_seen_at >= joined.last_seen_at);
        assert!(matches!(
            service.heartbeat(ParticipantId::new()).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_requires_supervisor_role() {
        let (service, _, event_id, _) = setup(EventStatus::Published).await;
        assert_ok!(service.join(event_id, request("phone-1")).await);
        let guest = Actor {
            user_id: UserId::new(),
            role: Role::Participant,
        };
        assert!(matches!(
            service.list(&guest, event_id, true).await,
            Err(ApiError::Forbidden(_))
        ));
        let staff = Actor {
            user_id: UserId::new(),
            role: Role::SecurityStaff,
        };
        let listed = assert_ok!(service.list(&staff, event_id, true).await);
        assert_eq!(listed.len(), 1);
    }
}
