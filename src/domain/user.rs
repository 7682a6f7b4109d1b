//! Users, roles and the authenticated actor.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ParseEnumError, UserId};
use crate::error::ApiError;

/// Authorization role carried by every user and token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Attendee; default for self-registration.
    Participant,
    /// Creates and runs events.
    EventOrganizer,
    /// On-site security; triages reports and risk levels.
    SecurityStaff,
    /// Unrestricted administrator.
    SuperAdmin,
}

impl Role {
    /// Canonical upper-case name, as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Participant => "PARTICIPANT",
            Self::EventOrganizer => "EVENT_ORGANIZER",
            Self::SecurityStaff => "SECURITY_STAFF",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PARTICIPANT" => Ok(Self::Participant),
            "EVENT_ORGANIZER" => Ok(Self::EventOrganizer),
            "SECURITY_STAFF" => Ok(Self::SecurityStaff),
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// A registered user. The password hash never leaves the service layer.
#[derive(Debug, Clone)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Lower-cased, unique email address.
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Authorization role.
    pub role: Role,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last profile mutation.
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Pre-generated identifier.
    pub id: UserId,
    /// Lower-cased email address.
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Authorization role.
    pub role: Role,
}

/// The authenticated caller of a request, decoded from an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Caller's user id.
    pub user_id: UserId,
    /// Caller's role at token issue time.
    pub role: Role,
}

impl Actor {
    /// Returns `true` for [`Role::SuperAdmin`].
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Fails with [`ApiError::Forbidden`] unless the actor holds one of
    /// `allowed`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] when the role is not in `allowed`.
    pub fn require_any(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "role {} is not permitted to perform this action",
                self.role
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn role_string_round_trip() {
        for role in [
            Role::Participant,
            Role::EventOrganizer,
            Role::SecurityStaff,
            Role::SuperAdmin,
        ] {
            assert_eq!(role.as_str().parse::<Role>().ok(), Some(role));
        }
        assert!("ROOT".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_screaming_snake() {
        let json = serde_json::to_string(&Role::EventOrganizer).unwrap_or_default();
        assert_eq!(json, "\"EVENT_ORGANIZER\"");
    }

    #[test]
    fn require_any_rejects_other_roles() {
        let actor = Actor {
            user_id: UserId::new(),
            role: Role::Participant,
        };
        assert!(actor.require_any(&[Role::Participant]).is_ok());
        let Err(err) = actor.require_any(&[Role::EventOrganizer, Role::SuperAdmin]) else {
            panic!("participant must not pass organizer gate");
        };
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
