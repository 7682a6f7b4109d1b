//! PostgreSQL implementation of the repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use super::models::{
    EventRow, LocationRow, ParticipantRow, ReportRow, UserRow, ZoneRow, convert_rows,
};
use super::repository::{
    EventQuery, EventRepository, LocationRepository, Page, ParticipantRepository,
    ReportRepository, UserRepository, ZoneRepository,
};
use super::OwnershipGuard;
use crate::domain::{
    Event, EventChanges, EventId, EventStatus, NewEvent, NewLocation, NewParticipant, NewReport,
    NewUser, NewZone, Participant, ParticipantId, ParticipantLocation, Report, ReportFilter,
    ReportId, ReportPriority, ReportStatus, RiskLevel, Role, User, UserId, Zone, ZoneChanges,
    ZoneId,
};
use crate::error::ApiError;

const USER_COLUMNS: &str = "id, email, password_hash, name, phone, role, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, organizer_id, name, description, start_date, end_date, \
     location_name, latitude, longitude, max_capacity, join_code, status, created_at, updated_at";

const PARTICIPANT_COLUMNS: &str =
    "id, event_id, device_id, user_id, name, phone, is_active, joined_at, last_seen_at";

const ZONE_COLUMNS: &str = "id, event_id, name, description, polygon, risk_level, capacity, \
     color, created_at, updated_at";

const ZONE_COLUMNS_Z: &str = "z.id, z.event_id, z.name, z.description, z.polygon, \
     z.risk_level, z.capacity, z.color, z.created_at, z.updated_at";

const LOCATION_COLUMNS: &str =
    "id, participant_id, latitude, longitude, accuracy, zone_id, recorded_at";

const LOCATION_COLUMNS_L: &str =
    "l.id, l.participant_id, l.latitude, l.longitude, l.accuracy, l.zone_id, l.recorded_at";

const REPORT_COLUMNS: &str = "id, event_id, participant_id, user_id, title, message, latitude, \
     longitude, status, priority, created_at, updated_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn insert(&self, user: NewUser) -> Result<User, ApiError> {
        let sql = format!(
            "INSERT INTO users (id, email, password_hash, name, phone, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(*user.id.as_uuid())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(&user.phone)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, ApiError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list(&self, page: Page) -> Result<(Vec<User>, u64), ApiError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok((convert_rows(rows)?, count(total)))
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: Option<String>,
        phone: Option<String>,
    ) -> Result<Option<User>, ApiError> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), phone = COALESCE($3, phone), \
             updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(*id.as_uuid())
            .bind(name)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn update_password(&self, id: UserId, password_hash: String) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_role(&self, id: UserId, role: Role) -> Result<Option<User>, ApiError> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(*id.as_uuid())
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn delete(&self, id: UserId) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|err| match &err {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    ApiError::Conflict(format!("user {id} still organizes events"))
                }
                _ => ApiError::from(err),
            })?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EventRepository for PostgresStore {
    async fn insert(&self, event: NewEvent) -> Result<Event, ApiError> {
        let sql = format!(
            "INSERT INTO events (id, organizer_id, name, description, start_date, end_date, \
             location_name, latitude, longitude, max_capacity, join_code, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(*event.id.as_uuid())
            .bind(*event.organizer_id.as_uuid())
            .bind(&event.name)
            .bind(&event.description)
            .bind(event.start_date)
            .bind(event.end_date)
            .bind(&event.location_name)
            .bind(event.latitude)
            .bind(event.longitude)
            .bind(event.max_capacity)
            .bind(&event.join_code)
            .bind(EventStatus::Draft.as_str())
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, ApiError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_by_join_code(&self, code: &str) -> Result<Option<Event>, ApiError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE join_code = $1");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list(&self, query: EventQuery, page: Page) -> Result<(Vec<Event>, u64), ApiError> {
        const FILTER: &str =
            "($1::text IS NULL OR status = $1) AND ($2::uuid IS NULL OR organizer_id = $2)";
        let status = query.status.map(EventStatus::as_str);
        let organizer = query.organizer_id.map(uuid::Uuid::from);

        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE {FILTER} \
             ORDER BY start_date ASC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(status)
            .bind(organizer)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM events WHERE {FILTER}");
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(status)
            .bind(organizer)
            .fetch_one(&self.pool)
            .await?;

        Ok((convert_rows(rows)?, count(total)))
    }

    async fn find_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Event>, ApiError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE status = $1 AND start_date >= $2 \
             ORDER BY start_date ASC"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(EventStatus::Published.as_str())
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        convert_rows(rows)
    }

    async fn find_ongoing(&self, now: DateTime<Utc>) -> Result<Vec<Event>, ApiError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE status = $1 AND start_date <= $2 AND end_date >= $2 \
             ORDER BY start_date ASC"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(EventStatus::Ongoing.as_str())
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        convert_rows(rows)
    }

    async fn update_guarded(
        &self,
        id: EventId,
        guard: OwnershipGuard,
        from_status: Option<EventStatus>,
        changes: &EventChanges,
    ) -> Result<Option<Event>, ApiError> {
        let sql = format!(
            "UPDATE events SET \
                name = COALESCE($4, name), \
                description = COALESCE($5, description), \
                start_date = COALESCE($6, start_date), \
                end_date = COALESCE($7, end_date), \
                location_name = COALESCE($8, location_name), \
                latitude = COALESCE($9, latitude), \
                longitude = COALESCE($10, longitude), \
                max_capacity = COALESCE($11, max_capacity), \
                status = COALESCE($12, status), \
                updated_at = now() \
             WHERE id = $1 \
               AND ($2::uuid IS NULL OR organizer_id = $2) \
               AND ($3::text IS NULL OR status = $3) \
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(*id.as_uuid())
            .bind(guard.organizer_id().map(uuid::Uuid::from))
            .bind(from_status.map(EventStatus::as_str))
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(changes.start_date)
            .bind(changes.end_date)
            .bind(&changes.location_name)
            .bind(changes.latitude)
            .bind(changes.longitude)
            .bind(changes.max_capacity)
            .bind(changes.status.map(EventStatus::as_str))
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn delete_guarded(&self, id: EventId, guard: OwnershipGuard) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "DELETE FROM events WHERE id = $1 AND ($2::uuid IS NULL OR organizer_id = $2)",
        )
        .bind(*id.as_uuid())
        .bind(guard.organizer_id().map(uuid::Uuid::from))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ParticipantRepository for PostgresStore {
    async fn join(&self, participant: NewParticipant) -> Result<Option<Participant>, ApiError> {
        let joinable: Vec<&str> = EventStatus::JOINABLE
            .iter()
            .map(|s| s.as_str())
            .collect();
        let sql = format!(
            "INSERT INTO participants \
                (id, event_id, device_id, user_id, name, phone, is_active, joined_at, last_seen_at) \
             SELECT $1, e.id, $3, $4, $5, $6, TRUE, $7, $7 \
               FROM events e WHERE e.id = $2 AND e.status = ANY($8) \
             ON CONFLICT (event_id, device_id) DO UPDATE SET \
                is_active = TRUE, \
                last_seen_at = CASE WHEN participants.is_active \
                                    THEN participants.last_seen_at \
                                    ELSE EXCLUDED.last_seen_at END \
             RETURNING {PARTICIPANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(*participant.id.as_uuid())
            .bind(*participant.event_id.as_uuid())
            .bind(&participant.device_id)
            .bind(participant.user_id.map(uuid::Uuid::from))
            .bind(&participant.name)
            .bind(&participant.phone)
            .bind(participant.joined_at)
            .bind(joinable)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: ParticipantId) -> Result<Option<Participant>, ApiError> {
        let sql = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1");
        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn deactivate(&self, id: ParticipantId) -> Result<Option<Participant>, ApiError> {
        let sql = format!(
            "UPDATE participants SET is_active = FALSE WHERE id = $1 \
             RETURNING {PARTICIPANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn touch(
        &self,
        id: ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<Option<Participant>, ApiError> {
        let sql = format!(
            "UPDATE participants SET last_seen_at = GREATEST(last_seen_at, $2) WHERE id = $1 \
             RETURNING {PARTICIPANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(*id.as_uuid())
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn count_active(&self, event_id: EventId) -> Result<u64, ApiError> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM participants WHERE event_id = $1 AND is_active",
        )
        .bind(*event_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(count(n))
    }

    async fn list_by_event(
        &self,
        event_id: EventId,
        active_only: bool,
    ) -> Result<Vec<Participant>, ApiError> {
        let sql = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE event_id = $1 AND ($2 = FALSE OR is_active) ORDER BY joined_at ASC"
        );
        let rows = sqlx::query_as::<_, ParticipantRow>(&sql)
            .bind(*event_id.as_uuid())
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ZoneRepository for PostgresStore {
    async fn insert_guarded(
        &self,
        zone: NewZone,
        guard: OwnershipGuard,
    ) -> Result<Option<Zone>, ApiError> {
        let sql = format!(
            "INSERT INTO zones (id, event_id, name, description, polygon, risk_level, capacity, color) \
             SELECT $1, e.id, $3, $4, $5, $6, $7, $8 FROM events e \
              WHERE e.id = $2 AND ($9::uuid IS NULL OR e.organizer_id = $9) \
             RETURNING {ZONE_COLUMNS}"
        );
        sqlx::query_as::<_, ZoneRow>(&sql)
            .bind(*zone.id.as_uuid())
            .bind(*zone.event_id.as_uuid())
            .bind(&zone.name)
            .bind(&zone.description)
            .bind(Json(&zone.polygon))
            .bind(zone.risk_level.as_str())
            .bind(zone.capacity)
            .bind(&zone.color)
            .bind(guard.organizer_id().map(uuid::Uuid::from))
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, ApiError> {
        let sql = format!("SELECT {ZONE_COLUMNS} FROM zones WHERE id = $1");
        sqlx::query_as::<_, ZoneRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_by_event(&self, event_id: EventId) -> Result<Vec<Zone>, ApiError> {
        let sql = format!(
            "SELECT {ZONE_COLUMNS} FROM zones WHERE event_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, ZoneRow>(&sql)
            .bind(*event_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        convert_rows(rows)
    }

    async fn list_by_risk(
        &self,
        event_id: EventId,
        risk_level: RiskLevel,
    ) -> Result<Vec<Zone>, ApiError> {
        let sql = format!(
            "SELECT {ZONE_COLUMNS} FROM zones WHERE event_id = $1 AND risk_level = $2 \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, ZoneRow>(&sql)
            .bind(*event_id.as_uuid())
            .bind(risk_level.as_str())
            .fetch_all(&self.pool)
            .await?;
        convert_rows(rows)
    }

    async fn update_guarded(
        &self,
        id: ZoneId,
        guard: OwnershipGuard,
        changes: &ZoneChanges,
    ) -> Result<Option<Zone>, ApiError> {
        let sql = format!(
            "UPDATE zones z SET \
                name = COALESCE($3, z.name), \
                description = COALESCE($4, z.description), \
                polygon = COALESCE($5, z.polygon), \
                risk_level = COALESCE($6, z.risk_level), \
                capacity = COALESCE($7, z.capacity), \
                color = COALESCE($8, z.color), \
                updated_at = now() \
             FROM events e \
             WHERE z.id = $1 AND e.id = z.event_id \
               AND ($2::uuid IS NULL OR e.organizer_id = $2) \
             RETURNING {ZONE_COLUMNS_Z}"
        );
        sqlx::query_as::<_, ZoneRow>(&sql)
            .bind(*id.as_uuid())
            .bind(guard.organizer_id().map(uuid::Uuid::from))
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(changes.polygon.as_ref().map(Json))
            .bind(changes.risk_level.map(RiskLevel::as_str))
            .bind(changes.capacity)
            .bind(&changes.color)
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn delete_guarded(&self, id: ZoneId, guard: OwnershipGuard) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "DELETE FROM zones z USING events e \
             WHERE z.id = $1 AND e.id = z.event_id \
               AND ($2::uuid IS NULL OR e.organizer_id = $2)",
        )
        .bind(*id.as_uuid())
        .bind(guard.organizer_id().map(uuid::Uuid::from))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LocationRepository for PostgresStore {
    async fn insert(&self, location: NewLocation) -> Result<ParticipantLocation, ApiError> {
        let sql = format!(
            "INSERT INTO participant_locations \
                (id, participant_id, latitude, longitude, accuracy, zone_id, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, GREATEST($7::timestamptz, COALESCE( \
                (SELECT MAX(recorded_at) FROM participant_locations WHERE participant_id = $2), \
                $7::timestamptz))) \
             RETURNING {LOCATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(*location.id.as_uuid())
            .bind(*location.participant_id.as_uuid())
            .bind(location.latitude)
            .bind(location.longitude)
            .bind(location.accuracy)
            .bind(location.zone_id.map(uuid::Uuid::from))
            .bind(location.timestamp)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn insert_batch(&self, locations: Vec<NewLocation>) -> Result<u64, ApiError> {
        let mut tx = self.pool.begin().await?;
        let mut stored = 0_u64;
        for location in locations {
            let result = sqlx::query(
                "INSERT INTO participant_locations \
                    (id, participant_id, latitude, longitude, accuracy, zone_id, recorded_at) \
                 SELECT $1, p.id, $3, $4, $5, $6, $7 FROM participants p WHERE p.id = $2 \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(*location.id.as_uuid())
            .bind(*location.participant_id.as_uuid())
            .bind(location.latitude)
            .bind(location.longitude)
            .bind(location.accuracy)
            .bind(location.zone_id.map(uuid::Uuid::from))
            .bind(location.timestamp)
            .execute(&mut *tx)
            .await?;
            stored += result.rows_affected();
        }
        tx.commit().await?;
        Ok(stored)
    }

    async fn latest_by_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<ParticipantLocation>, ApiError> {
        let sql = format!(
            "SELECT DISTINCT ON (l.participant_id) {LOCATION_COLUMNS_L} \
             FROM participant_locations l \
             JOIN participants p ON p.id = l.participant_id \
             WHERE p.event_id = $1 AND p.is_active \
             ORDER BY l.participant_id, l.recorded_at DESC"
        );
        let rows = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(*event_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_participants_in_zone_since(
        &self,
        zone_id: ZoneId,
        since: DateTime<Utc>,
    ) -> Result<u64, ApiError> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT participant_id) FROM participant_locations \
             WHERE zone_id = $1 AND recorded_at >= $2",
        )
        .bind(*zone_id.as_uuid())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count(n))
    }

    async fn history(
        &self,
        participant_id: ParticipantId,
        limit: u32,
    ) -> Result<Vec<ParticipantLocation>, ApiError> {
        let sql = format!(
            "SELECT {LOCATION_COLUMNS} FROM participant_locations WHERE participant_id = $1 \
             ORDER BY recorded_at DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(*participant_id.as_uuid())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM participant_locations WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ReportRepository for PostgresStore {
    async fn insert(&self, report: NewReport) -> Result<Report, ApiError> {
        let sql = format!(
            "INSERT INTO reports (id, event_id, participant_id, user_id, title, message, \
                latitude, longitude, status, priority) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {REPORT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(*report.id.as_uuid())
            .bind(*report.event_id.as_uuid())
            .bind(report.participant_id.map(uuid::Uuid::from))
            .bind(report.user_id.map(uuid::Uuid::from))
            .bind(&report.title)
            .bind(&report.message)
            .bind(report.latitude)
            .bind(report.longitude)
            .bind(ReportStatus::Pending.as_str())
            .bind(report.priority.as_str())
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: ReportId) -> Result<Option<Report>, ApiError> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1");
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_by_event(
        &self,
        event_id: EventId,
        filter: ReportFilter,
    ) -> Result<Vec<Report>, ApiError> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE event_id = $1 \
               AND ($2::text IS NULL OR status = $2) \
               AND ($3::text IS NULL OR priority = $3) \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(*event_id.as_uuid())
            .bind(filter.status.map(ReportStatus::as_str))
            .bind(filter.priority.map(ReportPriority::as_str))
            .fetch_all(&self.pool)
            .await?;
        convert_rows(rows)
    }

    async fn update_status(
        &self,
        id: ReportId,
        status: ReportStatus,
    ) -> Result<Option<Report>, ApiError> {
        let sql = format!(
            "UPDATE reports SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {REPORT_COLUMNS}"
        );
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(*id.as_uuid())
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn update_priority(
        &self,
        id: ReportId,
        priority: ReportPriority,
    ) -> Result<Option<Report>, ApiError> {
        let sql = format!(
            "UPDATE reports SET priority = $2, updated_at = now() WHERE id = $1 \
             RETURNING {REPORT_COLUMNS}"
        );
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(*id.as_uuid())
            .bind(priority.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn delete(&self, id: ReportId) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
