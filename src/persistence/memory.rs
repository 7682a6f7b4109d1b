//! In-process implementation of the repository traits.
//!
//! All tables live behind one [`RwLock`], so each trait method is atomic
//! with respect to every other, matching the single-statement writes of
//! the PostgreSQL store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::OwnershipGuard;
use super::repository::{
    EventQuery, EventRepository, LocationRepository, Page, ParticipantRepository,
    ReportRepository, UserRepository, ZoneRepository,
};
use crate::domain::{
    Event, EventChanges, EventId, EventStatus, NewEvent, NewLocation, NewParticipant, NewReport,
    NewUser, NewZone, Participant, ParticipantId, ParticipantLocation, Report, ReportFilter,
    ReportId, ReportPriority, ReportStatus, RiskLevel, Role, User, UserId, Zone, ZoneChanges,
    ZoneId,
};
use crate::error::ApiError;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    events: HashMap<EventId, Event>,
    participants: HashMap<ParticipantId, Participant>,
    zones: HashMap<ZoneId, Zone>,
    locations: Vec<ParticipantLocation>,
    reports: HashMap<ReportId, Report>,
}

impl Tables {
    fn organizer_of(&self, event_id: EventId) -> Option<UserId> {
        self.events.get(&event_id).map(|e| e.organizer_id)
    }
}

/// Repository store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn window<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: NewUser) -> Result<User, ApiError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(ApiError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }
        let now = Utc::now();
        let stored = User {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            phone: user.phone,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, ApiError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, page: Page) -> Result<(Vec<User>, u64), ApiError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let total = users.len() as u64;
        Ok((window(users, page), total))
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: Option<String>,
        phone: Option<String>,
    ) -> Result<Option<User>, ApiError> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            user.name = name;
        }
        if phone.is_some() {
            user.phone = phone;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: UserId, password_hash: String) -> Result<bool, ApiError> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(false);
        };
        user.password_hash = password_hash;
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_role(&self, id: UserId, role: Role) -> Result<Option<User>, ApiError> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        user.role = role;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: UserId) -> Result<bool, ApiError> {
        let mut tables = self.tables.write().await;
        if tables.events.values().any(|e| e.organizer_id == id) {
            return Err(ApiError::Conflict(format!(
                "user {id} still organizes events"
            )));
        }
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        for participant in tables.participants.values_mut() {
            if participant.user_id == Some(id) {
                participant.user_id = None;
            }
        }
        for report in tables.reports.values_mut() {
            if report.user_id == Some(id) {
                report.user_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn insert(&self, event: NewEvent) -> Result<Event, ApiError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&event.organizer_id) {
            return Err(ApiError::not_found("user", event.organizer_id));
        }
        if tables.events.values().any(|e| e.join_code == event.join_code) {
            return Err(ApiError::Conflict(format!(
                "join code already in use: {}",
                event.join_code
            )));
        }
        let now = Utc::now();
        let stored = Event {
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
            status: EventStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        tables.events.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, ApiError> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn find_by_join_code(&self, code: &str) -> Result<Option<Event>, ApiError> {
        let tables = self.tables.read().await;
        Ok(tables.events.values().find(|e| e.join_code == code).cloned())
    }

    async fn list(&self, query: EventQuery, page: Page) -> Result<(Vec<Event>, u64), ApiError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| query.status.is_none_or(|s| e.status == s))
            .filter(|e| query.organizer_id.is_none_or(|o| e.organizer_id == o))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        let total = events.len() as u64;
        Ok((window(events, page), total))
    }

    async fn find_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Event>, ApiError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.status == EventStatus::Published && e.start_date >= now)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events)
    }

    async fn find_ongoing(&self, now: DateTime<Utc>) -> Result<Vec<Event>, ApiError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.status == EventStatus::Ongoing && e.is_running_at(now))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events)
    }

    async fn update_guarded(
        &self,
        id: EventId,
        guard: OwnershipGuard,
        from_status: Option<EventStatus>,
        changes: &EventChanges,
    ) -> Result<Option<Event>, ApiError> {
        let mut tables = self.tables.write().await;
        let Some(event) = tables.events.get_mut(&id) else {
            return Ok(None);
        };
        if !guard.permits(event.organizer_id) || from_status.is_some_and(|s| s != event.status) {
            return Ok(None);
        }
        changes.apply_to(event);
        event.updated_at = Utc::now();
        Ok(Some(event.clone()))
    }

    async fn delete_guarded(&self, id: EventId, guard: OwnershipGuard) -> Result<bool, ApiError> {
        let mut tables = self.tables.write().await;
        if !tables
            .organizer_of(id)
            .is_some_and(|organizer| guard.permits(organizer))
        {
            return Ok(false);
        }
        tables.events.remove(&id);
        let removed: Vec<ParticipantId> = tables
            .participants
            .values()
            .filter(|p| p.event_id == id)
            .map(|p| p.id)
            .collect();
        tables.participants.retain(|_, p| p.event_id != id);
        tables.zones.retain(|_, z| z.event_id != id);
        tables
            .locations
            .retain(|l| !removed.contains(&l.participant_id));
        tables.reports.retain(|_, r| r.event_id != id);
        Ok(true)
    }
}

#[async_trait]
impl ParticipantRepository for MemoryStore {
    async fn join(&self, participant: NewParticipant) -> Result<Option<Participant>, ApiError> {
        let mut tables = self.tables.write().await;
        let joinable = tables
            .events
            .get(&participant.event_id)
            .is_some_and(|e| e.status.accepts_participants());
        if !joinable {
            return Ok(None);
        }
        if let Some(existing) = tables.participants.values_mut().find(|p| {
            p.event_id == participant.event_id && p.device_id == participant.device_id
        }) {
            if !existing.is_active {
                existing.is_active = true;
                existing.last_seen_at = participant.joined_at;
            }
            return Ok(Some(existing.clone()));
        }
        let stored = participant.into_participant();
        tables.participants.insert(stored.id, stored.clone());
        Ok(Some(stored))
    }

    async fn find_by_id(&self, id: ParticipantId) -> Result<Option<Participant>, ApiError> {
        Ok(self.tables.read().await.participants.get(&id).cloned())
    }

    async fn deactivate(&self, id: ParticipantId) -> Result<Option<Participant>, ApiError> {
        let mut tables = self.tables.write().await;
        let Some(participant) = tables.participants.get_mut(&id) else {
            return Ok(None);
        };
        participant.is_active = false;
        Ok(Some(participant.clone()))
    }

    async fn touch(
        &self,
        id: ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<Option<Participant>, ApiError> {
        let mut tables = self.tables.write().await;
        let Some(participant) = tables.participants.get_mut(&id) else {
            return Ok(None);
        };
        participant.last_seen_at = participant.last_seen_at.max(at);
        Ok(Some(participant.clone()))
    }

    async fn count_active(&self, event_id: EventId) -> Result<u64, ApiError> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .values()
            .filter(|p| p.event_id == event_id && p.is_active)
            .count() as u64)
    }

    async fn list_by_event(
        &self,
        event_id: EventId,
        active_only: bool,
    ) -> Result<Vec<Participant>, ApiError> {
        let tables = self.tables.read().await;
        let mut participants: Vec<Participant> = tables
            .participants
            .values()
            .filter(|p| p.event_id == event_id && (!active_only || p.is_active))
            .cloned()
            .collect();
        participants.sort_by_key(|p| p.joined_at);
        Ok(participants)
    }
}

#[async_trait]
impl ZoneRepository for MemoryStore {
    async fn insert_guarded(
        &self,
        zone: NewZone,
        guard: OwnershipGuard,
    ) -> Result<Option<Zone>, ApiError> {
        let mut tables = self.tables.write().await;
        if !tables
            .organizer_of(zone.event_id)
            .is_some_and(|organizer| guard.permits(organizer))
        {
            return Ok(None);
        }
        let stored = zone.into_zone(Utc::now());
        tables.zones.insert(stored.id, stored.clone());
        Ok(Some(stored))
    }

    async fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, ApiError> {
        Ok(self.tables.read().await.zones.get(&id).cloned())
    }

    async fn list_by_event(&self, event_id: EventId) -> Result<Vec<Zone>, ApiError> {
        let tables = self.tables.read().await;
        let mut zones: Vec<Zone> = tables
            .zones
            .values()
            .filter(|z| z.event_id == event_id)
            .cloned()
            .collect();
        zones.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(zones)
    }

    async fn list_by_risk(
        &self,
        event_id: EventId,
        risk_level: RiskLevel,
    ) -> Result<Vec<Zone>, ApiError> {
        let mut zones = ZoneRepository::list_by_event(self, event_id).await?;
        zones.retain(|z| z.risk_level == risk_level);
        Ok(zones)
    }

    async fn update_guarded(
        &self,
        id: ZoneId,
        guard: OwnershipGuard,
        changes: &ZoneChanges,
    ) -> Result<Option<Zone>, ApiError> {
        let mut tables = self.tables.write().await;
        let Some(event_id) = tables.zones.get(&id).map(|z| z.event_id) else {
            return Ok(None);
        };
        if !tables
            .organizer_of(event_id)
            .is_some_and(|organizer| guard.permits(organizer))
        {
            return Ok(None);
        }
        let Some(zone) = tables.zones.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(zone);
        zone.updated_at = Utc::now();
        Ok(Some(zone.clone()))
    }

    async fn delete_guarded(&self, id: ZoneId, guard: OwnershipGuard) -> Result<bool, ApiError> {
        let mut tables = self.tables.write().await;
        let Some(event_id) = tables.zones.get(&id).map(|z| z.event_id) else {
            return Ok(false);
        };
        if !tables
            .organizer_of(event_id)
            .is_some_and(|organizer| guard.permits(organizer))
        {
            return Ok(false);
        }
        tables.zones.remove(&id);
        for location in &mut tables.locations {
            if location.zone_id == Some(id) {
                location.zone_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl LocationRepository for MemoryStore {
    async fn insert(&self, location: NewLocation) -> Result<ParticipantLocation, ApiError> {
        let mut tables = self.tables.write().await;
        if !tables.participants.contains_key(&location.participant_id) {
            return Err(ApiError::not_found("participant", location.participant_id));
        }
        if let Some(zone_id) = location.zone_id {
            if !tables.zones.contains_key(&zone_id) {
                return Err(ApiError::not_found("zone", zone_id));
            }
        }
        let latest = tables
            .locations
            .iter()
            .filter(|l| l.participant_id == location.participant_id)
            .map(|l| l.timestamp)
            .max();
        let timestamp = latest.map_or(location.timestamp, |t| t.max(location.timestamp));
        let stored = location.into_location(timestamp);
        tables.locations.push(stored.clone());
        Ok(stored)
    }

    async fn insert_batch(&self, locations: Vec<NewLocation>) -> Result<u64, ApiError> {
        let mut tables = self.tables.write().await;
        let mut stored = 0_u64;
        for location in locations {
            let duplicate = tables.locations.iter().any(|l| l.id == location.id);
            if duplicate || !tables.participants.contains_key(&location.participant_id) {
                continue;
            }
            let timestamp = location.timestamp;
            tables.locations.push(location.into_location(timestamp));
            stored += 1;
        }
        Ok(stored)
    }

    async fn latest_by_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<ParticipantLocation>, ApiError> {
        let tables = self.tables.read().await;
        let mut latest: HashMap<ParticipantId, &ParticipantLocation> = HashMap::new();
        for location in &tables.locations {
            let active_in_event = tables
                .participants
                .get(&location.participant_id)
                .is_some_and(|p| p.event_id == event_id && p.is_active);
            if !active_in_event {
                continue;
            }
            latest
                .entry(location.participant_id)
                .and_modify(|current| {
                    if location.timestamp >= current.timestamp {
                        *current = location;
                    }
                })
                .or_insert(location);
        }
        let mut result: Vec<ParticipantLocation> = latest.into_values().cloned().collect();
        result.sort_by_key(|l| l.participant_id);
        Ok(result)
    }

    async fn count_participants_in_zone_since(
        &self,
        zone_id: ZoneId,
        since: DateTime<Utc>,
    ) -> Result<u64, ApiError> {
        let tables = self.tables.read().await;
        let mut seen: Vec<ParticipantId> = tables
            .locations
            .iter()
            .filter(|l| l.zone_id == Some(zone_id) && l.timestamp >= since)
            .map(|l| l.participant_id)
            .collect();
        seen.sort_unstable();
        seen.dedup();
        Ok(seen.len() as u64)
    }

    async fn history(
        &self,
        participant_id: ParticipantId,
        limit: u32,
    ) -> Result<Vec<ParticipantLocation>, ApiError> {
        let tables = self.tables.read().await;
        let mut history: Vec<ParticipantLocation> = tables
            .locations
            .iter()
            .filter(|l| l.participant_id == participant_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history.truncate(limit as usize);
        Ok(history)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, ApiError> {
        let mut tables = self.tables.write().await;
        let before = tables.locations.len();
        tables.locations.retain(|l| l.timestamp >= cutoff);
        Ok((before - tables.locations.len()) as u64)
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn insert(&self, report: NewReport) -> Result<Report, ApiError> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&report.event_id) {
            return Err(ApiError::not_found("event", report.event_id));
        }
        if let Some(participant_id) = report.participant_id {
            if !tables.participants.contains_key(&participant_id) {
                return Err(ApiError::not_found("participant", participant_id));
            }
        }
        if let Some(user_id) = report.user_id {
            if !tables.users.contains_key(&user_id) {
                return Err(ApiError::not_found("user", user_id));
            }
        }
        let stored = report.into_report(Utc::now());
        tables.reports.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: ReportId) -> Result<Option<Report>, ApiError> {
        Ok(self.tables.read().await.reports.get(&id).cloned())
    }

    async fn list_by_event(
        &self,
        event_id: EventId,
        filter: ReportFilter,
    ) -> Result<Vec<Report>, ApiError> {
        let tables = self.tables.read().await;
        let mut reports: Vec<Report> = tables
            .reports
            .values()
            .filter(|r| r.event_id == event_id && filter.matches(r))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(reports)
    }

    async fn update_status(
        &self,
        id: ReportId,
        status: ReportStatus,
    ) -> Result<Option<Report>, ApiError> {
        let mut tables = self.tables.write().await;
        let Some(report) = tables.reports.get_mut(&id) else {
            return Ok(None);
        };
        report.status = status;
        report.updated_at = Utc::now();
        Ok(Some(report.clone()))
    }

    async fn update_priority(
        &self,
        id: ReportId,
        priority: ReportPriority,
    ) -> Result<Option<Report>, ApiError> {
        let mut tables = self.tables.write().await;
        let Some(report) = tables.reports.get_mut(&id) else {
            return Ok(None);
        };
        report.priority = priority;
        report.updated_at = Utc::now();
        Ok(Some(report.clone()))
    }

    async fn delete(&self, id: ReportId) -> Result<bool, ApiError> {
        Ok(self.tables.write().await.reports.remove(&id).is_some())
    }
}
