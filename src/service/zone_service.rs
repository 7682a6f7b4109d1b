//! Zone management and risk levels.

use std::sync::Arc;

use crate::auth::{ORGANIZER_OR_ADMIN, SUPERVISORS};
use crate::domain::{
    Actor, EventId, GeoPoint, NewZone, RiskLevel, Role, Zone, ZoneChanges, ZoneId,
};
use crate::error::ApiError;
use crate::persistence::{EventRepository, OwnershipGuard, ZoneRepository};

use super::FieldChecks;

/// Input for [`ZoneService::create`].
#[derive(Debug, Clone)]
pub struct CreateZone {
    /// Owning event.
    pub event_id: EventId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Boundary vertices, at least three.
    pub polygon: Vec<GeoPoint>,
    /// Initial risk level; LOW when omitted.
    pub risk_level: Option<RiskLevel>,
    /// Optional positive head-count capacity.
    pub capacity: Option<i32>,
    /// Display color.
    pub color: Option<String>,
}

/// Zone management.
#[derive(Debug, Clone)]
pub struct ZoneService {
    events: Arc<dyn EventRepository>,
    zones: Arc<dyn ZoneRepository>,
}

fn check_changes(changes: &ZoneChanges) -> Result<(), ApiError> {
    let mut checks = FieldChecks::new();
    if let Some(name) = &changes.name {
        checks.not_blank(name, "name");
    }
    if let Some(polygon) = &changes.polygon {
        checks.polygon(polygon, "polygon");
    }
    checks.require(
        changes.capacity.is_none_or(|cap| cap > 0),
        "capacity",
        "must be positive",
    );
    checks.finish()
}

impl ZoneService {
    /// Creates the service.
    #[must_use]
    pub fn new(events: Arc<dyn EventRepository>, zones: Arc<dyn ZoneRepository>) -> Self {
        Self { events, zones }
    }

    /// Adds a zone to an event.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] for a blank name or invalid polygon.
    /// - [`ApiError::NotFound`] if the event is missing.
    /// - [`ApiError::Forbidden`] unless the caller organizes the event or
    ///   is SUPER_ADMIN.
    pub async fn create(&self, actor: &Actor, input: CreateZone) -> Result<Zone, ApiError> {
        actor.require_any(ORGANIZER_OR_ADMIN)?;
        FieldChecks::new()
            .not_blank(&input.name, "name")
            .polygon(&input.polygon, "polygon")
            .require(
                input.capacity.is_none_or(|cap| cap > 0),
                "capacity",
                "must be positive",
            )
            .finish()?;

        let guard = OwnershipGuard::for_actor(actor, &[]);
        let event_id = input.event_id;
        let new_zone = NewZone {
            id: ZoneId::new(),
            event_id,
            name: input.name.trim().to_string(),
            description: input.description,
            polygon: input.polygon,
            risk_level: input.risk_level.unwrap_or(RiskLevel::Low),
            capacity: input.capacity,
            color: input.color,
        };
        match self.zones.insert_guarded(new_zone, guard).await? {
            Some(zone) => {
                tracing::info!(zone_id = %zone.id, %event_id, risk = %zone.risk_level, "zone created");
                Ok(zone)
            }
            None => match self.events.find_by_id(event_id).await? {
                None => Err(ApiError::not_found("event", event_id)),
                Some(_) => Err(forbidden()),
            },
        }
    }

    /// Loads a zone.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if missing.
    pub async fn get(&self, id: ZoneId) -> Result<Zone, ApiError> {
        self.zones
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("zone", id))
    }

    /// Zones of an event in creation order.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the event is missing.
    pub async fn list(&self, event_id: EventId) -> Result<Vec<Zone>, ApiError> {
        if self.events.find_by_id(event_id).await?.is_none() {
            return Err(ApiError::not_found("event", event_id));
        }
        self.zones.list_by_event(event_id).await
    }

    /// CRITICAL zones followed by HIGH zones.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless organizer, security staff or admin.
    pub async fn critical(&self, actor: &Actor, event_id: EventId) -> Result<Vec<Zone>, ApiError> {
        actor.require_any(SUPERVISORS)?;
        let mut zones = self.zones.list_by_risk(event_id, RiskLevel::Critical).await?;
        zones.extend(self.zones.list_by_risk(event_id, RiskLevel::High).await?);
        Ok(zones)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] for invalid fields.
    /// - [`ApiError::NotFound`] if the zone is missing.
    /// - [`ApiError::Forbidden`] unless owner of the event or SUPER_ADMIN.
    pub async fn update(
        &self,
        actor: &Actor,
        id: ZoneId,
        changes: ZoneChanges,
    ) -> Result<Zone, ApiError> {
        actor.require_any(ORGANIZER_OR_ADMIN)?;
        check_changes(&changes)?;
        self.write(id, OwnershipGuard::for_actor(actor, &[]), &changes)
            .await
    }

    /// Sets the risk level. Security staff may do this on any event.
    ///
    /// # Errors
    ///
    /// As [`update`](Self::update), with SECURITY_STAFF also permitted.
    pub async fn update_risk_level(
        &self,
        actor: &Actor,
        id: ZoneId,
        risk_level: RiskLevel,
    ) -> Result<Zone, ApiError> {
        actor.require_any(SUPERVISORS)?;
        let guard = OwnershipGuard::for_actor(actor, &[Role::SecurityStaff]);
        let zone = self
            .write(id, guard, &ZoneChanges::risk_level(risk_level))
            .await?;
        tracing::info!(zone_id = %id, risk = %risk_level, by = %actor.user_id, "zone risk level changed");
        Ok(zone)
    }

    /// Deletes a zone. Locations recorded in it keep no zone reference.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] or [`ApiError::Forbidden`] as for
    /// [`update`](Self::update).
    pub async fn delete(&self, actor: &Actor, id: ZoneId) -> Result<(), ApiError> {
        actor.require_any(ORGANIZER_OR_ADMIN)?;
        let guard = OwnershipGuard::for_actor(actor, &[]);
        if self.zones.delete_guarded(id, guard).await? {
            tracing::info!(zone_id = %id, "zone deleted");
            return Ok(());
        }
        self.get(id).await?;
        Err(forbidden())
    }

    async fn write(
        &self,
        id: ZoneId,
        guard: OwnershipGuard,
        changes: &ZoneChanges,
    ) -> Result<Zone, ApiError> {
        if let Some(zone) = self.zones.update_guarded(id, guard, changes).await? {
            return Ok(zone);
        }
        self.get(id).await?;
        Err(forbidden())
    }
}

fn forbidden() -> ApiError {
    ApiError::Forbidden("only the event organizer or an admin may modify its zones".to_string())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, Utc};
    use tokio_test::assert_ok;

    use super::*;
    use crate::domain::{NewEvent, NewUser, UserId};
    use crate::persistence::Repositories;

    fn square(size: f64) -> Vec<GeoPoint> {
        vec![
            GeoPoint { latitude: 0.0, longitude: 0.0 },
            GeoPoint { latitude: 0.0, longitude: size },
            GeoPoint { latitude: size, longitude: size },
            GeoPoint { latitude: size, longitude: 0.0 },
        ]
    }

    async fn setup() -> (ZoneService, Actor, EventId) {
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
        let now = Utc::now();
        let event = assert_ok!(
            repos
                .events
                .insert(NewEvent {
                    id: EventId::new(),
                    organizer_id: organizer.user_id,
                    name: "Fest".into(),
                    description: None,
                    start_date: now,
                    end_date: now + Duration::hours(2),
                    location_name: "Park".into(),
                    latitude: 0.0,
                    longitude: 0.0,
                    max_capacity: None,
                    join_code: "ZONE2345".into(),
                })
                .await
        );
        (ZoneService::new(repos.events, repos.zones), organizer, event.id)
    }

    fn input(event_id: EventId, name: &str, risk: RiskLevel) -> CreateZone {
        CreateZone {
            event_id,
            name: name.into(),
            description: None,
            polygon: square(1.0),
            risk_level: Some(risk),
            capacity: None,
            color: Some("#FF0000".into()),
        }
    }

    #[tokio::test]
    async fn critical_zones_come_before_high() {
        let (service, organizer, event_id) = setup().await;
        assert_ok!(service.create(&organizer, input(event_id, "h1", RiskLevel::High)).await);
        assert_ok!(service.create(&organizer, input(event_id, "low", RiskLevel::Low)).await);
        assert_ok!(service.create(&organizer, input(event_id, "c1", RiskLevel::Critical)).await);
        assert_ok!(service.create(&organizer, input(event_id, "h2", RiskLevel::High)).await);

        let zones = assert_ok!(service.critical(&organizer, event_id).await);
        let levels: Vec<RiskLevel> = zones.iter().map(|z| z.risk_level).collect();
        assert_eq!(levels, [RiskLevel::Critical, RiskLevel::High, RiskLevel::High]);
    }

    #[tokio::test]
    async fn polygon_needs_three_vertices() {
        let (service, organizer, event_id) = setup().await;
        let mut bad = input(event_id, "tiny", RiskLevel::Low);
        bad.polygon.truncate(2);
        let result = service.create(&organizer, bad).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn foreign_organizer_is_forbidden() {
        let (service, _, event_id) = setup().await;
        let stranger = Actor {
            user_id: UserId::new(),
            role: Role::EventOrganizer,
        };
        let result = service
            .create(&stranger, input(event_id, "z", RiskLevel::Low))
            .await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
        let missing = service
            .create(&stranger, input(EventId::new(), "z", RiskLevel::Low))
            .await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn security_staff_may_only_change_risk() {
        let (service, organizer, event_id) = setup().await;
        let zone = assert_ok!(service.create(&organizer, input(event_id, "gate", RiskLevel::Low)).await);
        let staff = Actor {
            user_id: UserId::new(),
            role: Role::SecurityStaff,
        };

        let raised = assert_ok!(
            service
                .update_risk_level(&staff, zone.id, RiskLevel::Critical)
                .await
        );
        assert_eq!(raised.risk_level, RiskLevel::Critical);

        let rename = ZoneChanges {
            name: Some("renamed".into()),
            ..ZoneChanges::default()
        };
        assert!(matches!(
            service.update(&staff, zone.id, rename).await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn owner_updates_and_deletes() {
        let (service, organizer, event_id) = setup().await;
        let zone = assert_ok!(service.create(&organizer, input(event_id, "gate", RiskLevel::Low)).await);
        let changes = ZoneChanges {
            polygon: Some(square(2.0)),
            capacity: Some(50),
            ..ZoneChanges::default()
        };
        let updated = assert_ok!(service.update(&organizer, zone.id, changes).await);
        assert_eq!(updated.capacity, Some(50));
        assert_eq!(updated.polygon.len(), 4);

        assert_ok!(service.delete(&organizer, zone.id).await);
        assert!(matches!(
            service.delete(&organizer, zone.id).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
