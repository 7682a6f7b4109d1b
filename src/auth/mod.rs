//! Identity and access: password hashing, JWT session tokens and the
//! axum extractors that turn a bearer token into an [`Actor`].
//!
//! [`Actor`]: crate::domain::Actor

pub mod extractor;
pub mod password;
pub mod token;

use crate::domain::Role;

pub use extractor::{AuthUser, MaybeAuthUser};
pub use token::{Claims, TokenIssuer, TokenKind, TokenPair};

/// Only SUPER_ADMIN.
pub const ADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

/// Event organizers and admins.
pub const ORGANIZER_OR_ADMIN: &[Role] = &[Role::EventOrganizer, Role::SuperAdmin];

/// Security staff and admins.
pub const STAFF_OR_ADMIN: &[Role] = &[Role::SecurityStaff, Role::SuperAdmin];

/// Everyone who supervises an event: organizers, security staff, admins.
pub const SUPERVISORS: &[Role] = &[Role::EventOrganizer, Role::SecurityStaff, Role::SuperAdmin];
