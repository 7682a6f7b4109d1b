//! Domain layer: entities, lifecycle rules, zone classification and the
//! live-update bus.
//!
//! Nothing in here touches storage or HTTP. Services combine these types
//! with the repository traits in [`crate::persistence`].

pub mod event;
pub mod event_bus;
pub mod ids;
pub mod location;
pub mod participant;
pub mod report;
pub mod user;
pub mod zone;

pub use event::{Event, EventChanges, EventStatus, EventTransition, NewEvent, TransitionError};
pub use event_bus::EventBus;
pub use ids::{EventId, LocationId, ParticipantId, ReportId, UserId, ZoneId};
pub use location::{
    LocationNotifier, LocationUpdate, NewLocation, ParticipantLocation, ResolvedZone,
};
pub use participant::{NewParticipant, Participant};
pub use report::{NewReport, Report, ReportFilter, ReportPriority, ReportStatus};
pub use user::{Actor, NewUser, Role, User};
pub use zone::{GeoPoint, NewZone, RiskLevel, Zone, ZoneChanges};

/// A stored or supplied string did not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    /// Creates an error for `value` of the given enum `kind`.
    #[must_use]
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl From<ParseEnumError> for crate::error::ApiError {
    fn from(err: ParseEnumError) -> Self {
        Self::Internal(err.to_string())
    }
}
