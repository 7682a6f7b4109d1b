//! Incident reports with keyword-derived priority.

use std::sync::Arc;

use crate::auth::{ADMIN_ONLY, STAFF_OR_ADMIN, SUPERVISORS};
use crate::domain::report::classify_priority;
use crate::domain::{
    Actor, EventId, NewReport, ParticipantId, Report, ReportFilter, ReportId, ReportPriority,
    ReportStatus,
};
use crate::error::ApiError;
use crate::persistence::{EventRepository, ParticipantRepository, ReportRepository};

use super::FieldChecks;

/// Input for [`ReportService::create`].
#[derive(Debug, Clone)]
pub struct CreateReport {
    /// Event the incident happened at.
    pub event_id: EventId,
    /// Reporting participant, if known.
    pub participant_id: Option<ParticipantId>,
    /// Short headline.
    pub title: Option<String>,
    /// Description of the incident.
    pub message: String,
    /// Incident latitude.
    pub latitude: Option<f64>,
    /// Incident longitude.
    pub longitude: Option<f64>,
}

/// Incident reporting.
#[derive(Debug, Clone)]
pub struct ReportService {
    events: Arc<dyn EventRepository>,
    participants: Arc<dyn ParticipantRepository>,
    reports: Arc<dyn ReportRepository>,
}

impl ReportService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventRepository>,
        participants: Arc<dyn ParticipantRepository>,
        reports: Arc<dyn ReportRepository>,
    ) -> Self {
        Self {
            events,
            participants,
            reports,
        }
    }

    /// Files a PENDING report. Priority is derived from the title and
    /// message; an authenticated caller is recorded as the reporter.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] for a blank message or bad coordinates.
    /// - [`ApiError::NotFound`] if the event or participant is missing.
    /// - [`ApiError::BadRequest`] if the participant belongs to another
    ///   event.
    pub async fn create(
        &self,
        actor: Option<&Actor>,
        input: CreateReport,
    ) -> Result<Report, ApiError> {
        let mut checks = FieldChecks::new();
        checks.not_blank(&input.message, "message");
        checks.require(
            input.latitude.is_some() == input.longitude.is_some(),
            "longitude",
            "latitude and longitude must be given together",
        );
        if let Some(lat) = input.latitude {
            checks.latitude(lat, "latitude");
        }
        if let Some(lng) = input.longitude {
            checks.longitude(lng, "longitude");
        }
        checks.finish()?;

        if self.events.find_by_id(input.event_id).await?.is_none() {
            return Err(ApiError::not_found("event", input.event_id));
        }
        if let Some(participant_id) = input.participant_id {
            let participant = self
                .participants
                .find_by_id(participant_id)
                .await?
                .ok_or_else(|| ApiError::not_found("participant", participant_id))?;
            if participant.event_id != input.event_id {
                return Err(ApiError::BadRequest(
                    "participant does not belong to this event".to_string(),
                ));
            }
        }

        let text = match &input.title {
            Some(title) => format!("{title} {}", input.message),
            None => input.message.clone(),
        };
        let priority = classify_priority(&text);
        let report = self
            .reports
            .insert(NewReport {
                id: ReportId::new(),
                event_id: input.event_id,
                participant_id: input.participant_id,
                user_id: actor.map(|a| a.user_id),
                title: input.title,
                message: input.message,
                latitude: input.latitude,
                longitude: input.longitude,
                priority,
            })
            .await?;

        if priority == ReportPriority::Emergency {
            tracing::warn!(report_id = %report.id, event_id = %report.event_id, "emergency report filed");
        } else {
            tracing::info!(report_id = %report.id, event_id = %report.event_id, %priority, "report filed");
        }
        Ok(report)
    }

    /// Loads a report.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless security staff or admin;
    /// [`ApiError::NotFound`] if missing.
    pub async fn get(&self, actor: &Actor, id: ReportId) -> Result<Report, ApiError> {
        actor.require_any(STAFF_OR_ADMIN)?;
        self.reports
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("report", id))
    }

    /// Reports of an event, newest first.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless organizer, security staff or admin.
    pub async fn list(
        &self,
        actor: &Actor,
        event_id: EventId,
        filter: ReportFilter,
    ) -> Result<Vec<Report>, ApiError> {
        actor.require_any(SUPERVISORS)?;
        self.reports.list_by_event(event_id, filter).await
    }

    /// EMERGENCY reports of an event, newest first.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless organizer, security staff or admin.
    pub async fn emergencies(&self, actor: &Actor, event_id: EventId) -> Result<Vec<Report>, ApiError> {
        let filter = ReportFilter {
            status: None,
            priority: Some(ReportPriority::Emergency),
        };
        self.list(actor, event_id, filter).await
    }

    /// Sets the status. Any status may follow any other.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless security staff or admin;
    /// [`ApiError::NotFound`] if missing.
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: ReportId,
        status: ReportStatus,
    ) -> Result<Report, ApiError> {
        actor.require_any(STAFF_OR_ADMIN)?;
        let report = self
            .reports
            .update_status(id, status)
            .await?
            .ok_or_else(|| ApiError::not_found("report", id))?;
        tracing::info!(report_id = %id, %status, by = %actor.user_id, "report status changed");
        Ok(report)
    }

    /// Overrides the priority.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless security staff or admin;
    /// [`ApiError::NotFound`] if missing.
    pub async fn update_priority(
        &self,
        actor: &Actor,
        id: ReportId,
        priority: ReportPriority,
    ) -> Result<Report, ApiError> {
        actor.require_any(STAFF_OR_ADMIN)?;
        let report = self
            .reports
            .update_priority(id, priority)
            .await?
            .ok_or_else(|| ApiError::not_found("report", id))?;
        tracing::info!(report_id = %id, %priority, by = %actor.user_id, "report priority changed");
        Ok(report)
    }

    /// Deletes a report.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless SUPER_ADMIN; [`ApiError::NotFound`].
    pub async fn delete(&self, actor: &Actor, id: ReportId) -> Result<(), ApiError> {
        actor.require_any(ADMIN_ONLY)?;
        if !self.reports.delete(id).await? {
            return Err(ApiError::not_found("report", id));
        }
        tracing::info!(report_id = %id, "report deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, Utc};
    use tokio_test::assert_ok;

    use super::*;
    use crate::domain::{NewEvent, NewUser, Role, UserId};
    use crate::persistence::Repositories;

    async fn setup() -> (ReportService, EventId, Actor) {
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
                    end_date: now + Duration::hours(2),
                    location_name: "Park".into(),
                    latitude: 0.0,
                    longitude: 0.0,
                    max_capacity: None,
                    join_code: "REPT2345".into(),
                })
                .await
        );
        let service = ReportService::new(repos.events, repos.participants, repos.reports);
        let staff = Actor {
            user_id: UserId::new(),
            role: Role::SecurityStaff,
        };
        (service, event.id, staff)
    }

    fn report(event_id: EventId, title: Option<&str>, message: &str) -> CreateReport {
        CreateReport {
            event_id,
            participant_id: None,
            title: title.map(str::to_string),
            message: message.to_string(),
            latitude: None,
            longitude: None,
        }
    }

    #[tokio::test]
    async fn priority_comes_from_title_and_message() {
        let (service, event_id, _) = setup().await;
        let fire = assert_ok!(
            service
                .create(None, report(event_id, Some("Crowd"), "Fire near the stage"))
                .await
        );
        assert_eq!(fire.priority, ReportPriority::Emergency);
        assert_eq!(fire.status, ReportStatus::Pending);

        let fight = assert_ok!(
            service
                .create(None, report(event_id, Some("FIGHT"), "two people"))
                .await
        );
        assert_eq!(fight.priority, ReportPriority::High);

        let calm = assert_ok!(service.create(None, report(event_id, None, "all good")).await);
        assert_eq!(calm.priority, ReportPriority::Low);
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let (service, _, _) = setup().await;
        let result = service.create(None, report(EventId::new(), None, "help")).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn emergency_listing_and_workflow() {
        let (service, event_id, staff) = setup().await;
        let urgent = assert_ok!(
            service
                .create(None, report(event_id, None, "someone is unconscious"))
                .await
        );
        assert_ok!(service.create(None, report(event_id, None, "lost wallet")).await);

        let emergencies = assert_ok!(service.emergencies(&staff, event_id).await);
        assert_eq!(emergencies.len(), 1);

        let resolved = assert_ok!(
            service
                .update_status(&staff, urgent.id, ReportStatus::Resolved)
                .await
        );
        assert_eq!(resolved.status, ReportStatus::Resolved);
        let reopened = assert_ok!(
            service
                .update_status(&staff, urgent.id, ReportStatus::Pending)
                .await
        );
        assert_eq!(reopened.status, ReportStatus::Pending);

        let guest = Actor {
            user_id: UserId::new(),
            role: Role::Participant,
        };
        assert!(matches!(
            service.update_priority(&guest, urgent.id, ReportPriority::Low).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(&staff, urgent.id).await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn coordinates_must_come_in_pairs() {
        let (service, event_id, _) = setup().await;
        let mut input = report(event_id, None, "noise");
        input.latitude = Some(10.0);
        let result = service.create(None, input).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
