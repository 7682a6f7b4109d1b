//! Event participants: a device's (or user's) membership in one event.

use chrono::{DateTime, Utc};

use super::{EventId, ParticipantId, UserId};

/// Membership of one device in one event.
///
/// Leaving only clears `is_active`; history is retained and the same
/// device re-joining reactivates this record.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Participant identifier.
    pub id: ParticipantId,
    /// Event joined.
    pub event_id: EventId,
    /// Client device identifier, unique per event.
    pub device_id: String,
    /// Linked account, if the join was authenticated.
    pub user_id: Option<UserId>,
    /// Display name.
    pub name: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// `false` after leaving.
    pub is_active: bool,
    /// First join.
    pub joined_at: DateTime<Utc>,
    /// Last heartbeat, location ping or (re)join.
    pub last_seen_at: DateTime<Utc>,
}

impl Participant {
    /// Identity shown to real-time subscribers: the linked user when
    /// present, otherwise the participant record itself.
    #[must_use]
    pub fn public_id(&self) -> uuid::Uuid {
        self.user_id
            .map_or(*self.id.as_uuid(), |user_id| *user_id.as_uuid())
    }
}

/// Join request as seen by the repository.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    /// Identifier used if a new record is created.
    pub id: ParticipantId,
    /// Event to join.
    pub event_id: EventId,
    /// Client device identifier.
    pub device_id: String,
    /// Linked account.
    pub user_id: Option<UserId>,
    /// Display name.
    pub name: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Join time; also the new `last_seen_at` on creation or reactivation.
    pub joined_at: DateTime<Utc>,
}

impl NewParticipant {
    /// Materializes the record stored when no membership exists yet.
    #[must_use]
    pub fn into_participant(self) -> Participant {
        Participant {
            id: self.id,
            event_id: self.event_id,
            device_id: self.device_id,
            user_id: self.user_id,
            name: self.name,
            phone: self.phone,
            is_active: true,
            joined_at: self.joined_at,
            last_seen_at: self.joined_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(user_id: Option<UserId>) -> Participant {
        NewParticipant {
            id: ParticipantId::new(),
            event_id: EventId::new(),
            device_id: "device-1".to_string(),
            user_id,
            name: None,
            phone: None,
            joined_at: Utc::now(),
        }
        .into_participant()
    }

    #[test]
    fn new_participant_is_active_and_seen_at_join() {
        let p = sample(None);
        assert!(p.is_active);
        assert_eq!(p.joined_at, p.last_seen_at);
    }

    #[test]
    fn public_id_prefers_user() {
        let anonymous = sample(None);
        assert_eq!(anonymous.public_id(), *anonymous.id.as_uuid());

        let user_id = UserId::new();
        let linked = sample(Some(user_id));
        assert_eq!(linked.public_id(), *user_id.as_uuid());
    }
}
