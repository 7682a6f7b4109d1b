//! Location ingestion, zone classification and fan-out.
//!
//! The single-ping path persists, classifies and then hands a
//! [`LocationUpdate`] to the [`LocationNotifier`]. The batch path persists
//! and classifies only; nothing is broadcast for batched pings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use crate::auth::{ADMIN_ONLY, STAFF_OR_ADMIN, SUPERVISORS};
use crate::domain::zone::classify_point;
use crate::domain::{
    Actor, EventId, LocationId, LocationNotifier, LocationUpdate, NewLocation, ParticipantId,
    ParticipantLocation, ResolvedZone, Zone, ZoneId,
};
use crate::error::ApiError;
use crate::persistence::{LocationRepository, ParticipantRepository, ZoneRepository};

use super::FieldChecks;

/// Density window used when the caller does not give one.
pub const DEFAULT_DENSITY_MINUTES: u32 = 5;

/// Upper bound on history page size.
pub const MAX_HISTORY_LIMIT: u32 = 1000;

/// Default history page size.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Most pings accepted in one batch.
pub const MAX_BATCH_ITEMS: usize = 500;

/// Instant `days` days before `now`, or `None` outside the calendar range.
fn retention_cutoff(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(TimeDelta::try_days(i64::from(days))?)
}

/// One position report.
#[derive(Debug, Clone)]
pub struct LocationInput {
    /// Reporting participant.
    pub participant_id: ParticipantId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: Option<f64>,
    /// Client-side capture time; batch only, defaults to now.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Head count of a zone over a trailing window.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDensity {
    /// Zone measured.
    pub zone_id: ZoneId,
    /// Distinct participants seen in the zone.
    pub participant_count: u64,
    /// Window length in minutes.
    pub minutes: u32,
    /// Zone capacity, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
    /// `participant_count / capacity`, if a capacity is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<f64>,
}

/// Location pipeline.
#[derive(Debug, Clone)]
pub struct LocationService {
    participants: Arc<dyn ParticipantRepository>,
    zones: Arc<dyn ZoneRepository>,
    locations: Arc<dyn LocationRepository>,
    notifier: Arc<dyn LocationNotifier>,
}

fn check_input(checks: &mut FieldChecks, input: &LocationInput, prefix: &str) {
    checks
        .latitude(input.latitude, &format!("{prefix}latitude"))
        .longitude(input.longitude, &format!("{prefix}longitude"))
        .require(
            input.accuracy.is_none_or(|a| a.is_finite() && a >= 0.0),
            &format!("{prefix}accuracy"),
            "must be a non-negative number",
        );
}

impl LocationService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        participants: Arc<dyn ParticipantRepository>,
        zones: Arc<dyn ZoneRepository>,
        locations: Arc<dyn LocationRepository>,
        notifier: Arc<dyn LocationNotifier>,
    ) -> Self {
        Self {
            participants,
            zones,
            locations,
            notifier,
        }
    }

    /// Records one ping and broadcasts it to the event's subscribers.
    ///
    /// Broadcasting happens after the write and cannot fail the call.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] for out-of-range coordinates.
    /// - [`ApiError::NotFound`] if the participant does not exist.
    pub async fn update_location(
        &self,
        input: LocationInput,
    ) -> Result<ParticipantLocation, ApiError> {
        let mut checks = FieldChecks::new();
        check_input(&mut checks, &input, "");
        checks.finish()?;

        let participant = self
            .participants
            .find_by_id(input.participant_id)
            .await?
            .ok_or_else(|| ApiError::not_found("participant", input.participant_id))?;
        let zones = self.zones.list_by_event(participant.event_id).await?;
        let zone = classify_point(&zones, input.latitude, input.longitude);

        let stored = self
            .locations
            .insert(NewLocation {
                id: LocationId::new(),
                participant_id: participant.id,
                latitude: input.latitude,
                longitude: input.longitude,
                accuracy: input.accuracy,
                zone_id: zone.map(|z| z.id),
                timestamp: Utc::now(),
            })
            .await?;
        self.participants
            .touch(participant.id, stored.timestamp)
            .await?;

        self.notifier.notify(LocationUpdate {
            event_id: participant.event_id,
            participant_id: participant.id,
            participant_or_user_id: participant.public_id(),
            latitude: stored.latitude,
            longitude: stored.longitude,
            resolved_zone: zone.map(ResolvedZone::from),
            timestamp: stored.timestamp,
        });
        tracing::debug!(
            participant_id = %participant.id,
            event_id = %participant.event_id,
            zone_id = ?stored.zone_id,
            "location recorded"
        );
        Ok(stored)
    }

    /// Records many pings without broadcasting them.
    ///
    /// Items whose participant no longer exists are skipped. Returns the
    /// number of pings stored.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Forbidden`] unless security staff or admin.
    /// - [`ApiError::Validation`] if any item has invalid coordinates or
    ///   the batch holds more than [`MAX_BATCH_ITEMS`] pings.
    pub async fn batch_update(
        &self,
        actor: &Actor,
        items: Vec<LocationInput>,
    ) -> Result<u64, ApiError> {
        actor.require_any(STAFF_OR_ADMIN)?;
        let mut checks = FieldChecks::new();
        checks.require(
            items.len() <= MAX_BATCH_ITEMS,
            "locations",
            &format!("at most {MAX_BATCH_ITEMS} items per batch"),
        );
        for (index, item) in items.iter().enumerate() {
            check_input(&mut checks, item, &format!("locations[{index}]."));
        }
        checks.finish()?;

        let submitted = items.len();
        let now = Utc::now();
        let mut zones_by_event: HashMap<EventId, Vec<Zone>> = HashMap::new();
        let mut rows = Vec::with_capacity(submitted);
        for item in items {
            let Some(participant) = self.participants.find_by_id(item.participant_id).await? else {
                continue;
            };
            if !zones_by_event.contains_key(&participant.event_id) {
                let loaded = self.zones.list_by_event(participant.event_id).await?;
                zones_by_event.insert(participant.event_id, loaded);
            }
            let zones = zones_by_event
                .get(&participant.event_id)
                .map_or(&[][..], Vec::as_slice);
            let zone_id = classify_point(zones, item.latitude, item.longitude).map(|z| z.id);
            rows.push(NewLocation {
                id: LocationId::new(),
                participant_id: participant.id,
                latitude: item.latitude,
                longitude: item.longitude,
                accuracy: item.accuracy,
                zone_id,
                timestamp: item.timestamp.unwrap_or(now),
            });
        }
        let stored = self.locations.insert_batch(rows).await?;
        tracing::info!(submitted, stored, "location batch recorded");
        Ok(stored)
    }

    /// Distinct participants seen in a zone over the last `minutes`.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless organizer, security staff or admin;
    /// [`ApiError::NotFound`] if the zone is missing.
    pub async fn zone_density(
        &self,
        actor: &Actor,
        zone_id: ZoneId,
        minutes: Option<u32>,
    ) -> Result<ZoneDensity, ApiError> {
        actor.require_any(SUPERVISORS)?;
        let zone = self
            .zones
            .find_by_id(zone_id)
            .await?
            .ok_or_else(|| ApiError::not_found("zone", zone_id))?;
        let minutes = minutes.unwrap_or(DEFAULT_DENSITY_MINUTES);
        let since = Utc::now() - chrono::Duration::minutes(i64::from(minutes));
        let participant_count = self
            .locations
            .count_participants_in_zone_since(zone_id, since)
            .await?;
        let occupancy = zone
            .capacity
            .filter(|cap| *cap > 0)
            .map(|cap| participant_count as f64 / f64::from(cap));
        Ok(ZoneDensity {
            zone_id,
            participant_count,
            minutes,
            capacity: zone.capacity,
            occupancy,
        })
    }

    /// Latest ping of every active participant of an event.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless organizer, security staff or admin.
    pub async fn latest_by_event(
        &self,
        actor: &Actor,
        event_id: EventId,
    ) -> Result<Vec<ParticipantLocation>, ApiError> {
        actor.require_any(SUPERVISORS)?;
        self.locations.latest_by_event(event_id).await
    }

    /// A participant's pings, newest first. `limit` is clamped to
    /// `1..=1000` and defaults to 100.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless organizer, security staff or admin;
    /// [`ApiError::NotFound`] if the participant is missing.
    pub async fn history(
        &self,
        actor: &Actor,
        participant_id: ParticipantId,
        limit: Option<u32>,
    ) -> Result<Vec<ParticipantLocation>, ApiError> {
        actor.require_any(SUPERVISORS)?;
        if self.participants.find_by_id(participant_id).await?.is_none() {
            return Err(ApiError::not_found("participant", participant_id));
        }
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        self.locations.history(participant_id, limit).await
    }

    /// Deletes pings older than `days` days on behalf of an admin.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] unless SUPER_ADMIN; [`ApiError::Validation`]
    /// if `days` is zero or reaches past the calendar range.
    pub async fn cleanup(&self, actor: &Actor, days: u32) -> Result<u64, ApiError> {
        actor.require_any(ADMIN_ONLY)?;
        FieldChecks::new()
            .require(days > 0, "days", "must be at least 1")
            .finish()?;
        self.cleanup_older_than(days).await
    }

    /// Deletes pings older than `days` days.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] if the cutoff falls outside the calendar
    /// range; otherwise propagates storage failures.
    pub async fn cleanup_older_than(&self, days: u32) -> Result<u64, ApiError> {
        let cutoff = retention_cutoff(Utc::now(), days)
            .ok_or_else(|| ApiError::invalid_field("days", "out of range"))?;
        let deleted = self.locations.delete_older_than(cutoff).await?;
        tracing::info!(days, deleted, "old locations removed");
        Ok(deleted)
    }

    /// Spawns the periodic retention sweep. `retention_days == 0` disables
    /// it and returns `None`.
    #[must_use]
    pub fn spawn_retention_task(
        self: Arc<Self>,
        retention_days: u32,
        every: Duration,
    ) -> Option<JoinHandle<()>> {
        if retention_days == 0 {
            return None;
        }
        if retention_cutoff(Utc::now(), retention_days).is_none() {
            tracing::error!(retention_days, "retention period out of range, sweep disabled");
            return None;
        }
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if let Err(err) = self.cleanup_older_than(retention_days).await {
                    tracing::warn!(error = %err, "location retention sweep failed");
                }
            }
        }))
    }
}
