//! Persistence layer: repository traits and their two implementations.
//!
//! Services only see the traits in [`repository`]. [`PostgresStore`] backs
//! them with `sqlx::PgPool`; [`MemoryStore`] keeps everything in process
//! and is used by tests and when `PERSISTENCE_ENABLED=false`.
//!
//! Every read-check-write sequence with a race window (join-if-absent,
//! ownership check before update, DRAFT check before publish) is a single
//! conditional write in both stores.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::{Actor, Role, UserId};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use repository::{
    EventQuery, EventRepository, LocationRepository, Page, ParticipantRepository,
    ReportRepository, UserRepository, ZoneRepository,
};

/// Ownership predicate carried into conditional writes on events and
/// their zones.
///
/// An unrestricted guard matches any row; an organizer guard only matches
/// rows of events organized by that user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipGuard {
    organizer_id: Option<UserId>,
}

impl OwnershipGuard {
    /// Matches any event.
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self { organizer_id: None }
    }

    /// Matches only events organized by `user_id`.
    #[must_use]
    pub const fn organizer(user_id: UserId) -> Self {
        Self {
            organizer_id: Some(user_id),
        }
    }

    /// Unrestricted for [`Role::SuperAdmin`] and any role in `bypass`,
    /// otherwise restricted to the actor's own events.
    #[must_use]
    pub fn for_actor(actor: &Actor, bypass: &[Role]) -> Self {
        if actor.is_admin() || bypass.contains(&actor.role) {
            Self::unrestricted()
        } else {
            Self::organizer(actor.user_id)
        }
    }

    /// Organizer the guard is restricted to, if any.
    #[must_use]
    pub const fn organizer_id(&self) -> Option<UserId> {
        self.organizer_id
    }

    /// Returns `true` if an event organized by `organizer_id` matches.
    #[must_use]
    pub fn permits(&self, organizer_id: UserId) -> bool {
        self.organizer_id.is_none_or(|id| id == organizer_id)
    }
}

/// Bundle of repository handles injected into services.
#[derive(Debug, Clone)]
pub struct Repositories {
    /// User accounts.
    pub users: Arc<dyn UserRepository>,
    /// Events.
    pub events: Arc<dyn EventRepository>,
    /// Event memberships.
    pub participants: Arc<dyn ParticipantRepository>,
    /// Event zones.
    pub zones: Arc<dyn ZoneRepository>,
    /// Location pings.
    pub locations: Arc<dyn LocationRepository>,
    /// Incident reports.
    pub reports: Arc<dyn ReportRepository>,
}

impl Repositories {
    /// Repositories backed by PostgreSQL.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PostgresStore::new(pool)))
    }

    /// Repositories backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + EventRepository
            + ParticipantRepository
            + ZoneRepository
            + LocationRepository
            + ReportRepository
            + 'static,
    {
        Self {
            users: Arc::clone(&store) as Arc<dyn UserRepository>,
            events: Arc::clone(&store) as Arc<dyn EventRepository>,
            participants: Arc::clone(&store) as Arc<dyn ParticipantRepository>,
            zones: Arc::clone(&store) as Arc<dyn ZoneRepository>,
            locations: Arc::clone(&store) as Arc<dyn LocationRepository>,
            reports: store as Arc<dyn ReportRepository>,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_guard_is_unrestricted() {
        let admin = Actor {
            user_id: UserId::new(),
            role: Role::SuperAdmin,
        };
        let guard = OwnershipGuard::for_actor(&admin, &[]);
        assert_eq!(guard, OwnershipGuard::unrestricted());
        assert!(guard.permits(UserId::new()));
    }

    #[test]
    fn organizer_guard_only_permits_own_events() {
        let organizer = Actor {
            user_id: UserId::new(),
            role: Role::EventOrganizer,
        };
        let guard = OwnershipGuard::for_actor(&organizer, &[]);
        assert!(guard.permits(organizer.user_id));
        assert!(!guard.permits(UserId::new()));
    }

    #[test]
    fn bypass_roles_are_unrestricted() {
        let staff = Actor {
            user_id: UserId::new(),
            role: Role::SecurityStaff,
        };
        assert!(!OwnershipGuard::for_actor(&staff, &[]).permits(UserId::new()));
        assert!(
            OwnershipGuard::for_actor(&staff, &[Role::SecurityStaff]).permits(UserId::new())
        );
    }
}
