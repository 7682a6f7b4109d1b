//! Service layer: business rules over the repository traits.
//!
//! Each service owns `Arc` handles to the repositories it needs and
//! performs role checks against the calling [`Actor`](crate::domain::Actor)
//! before touching storage.

pub mod auth_service;
pub mod event_service;
pub mod location_service;
pub mod participant_service;
pub mod report_service;
pub mod zone_service;

pub use auth_service::{AuthService, Registration};
pub use event_service::{CreateEvent, EventService, UpdateEvent};
pub use location_service::{LocationInput, LocationService, ZoneDensity};
pub use participant_service::{JoinRequest, ParticipantService};
pub use report_service::{CreateReport, ReportService};
pub use zone_service::{CreateZone, ZoneService};

use crate::domain::zone::{MIN_POLYGON_VERTICES, valid_latitude, valid_longitude};
use crate::domain::GeoPoint;
use crate::error::{ApiError, FieldError};

/// Collects field-level validation failures before reporting them together.
#[derive(Debug, Default)]
pub(crate) struct FieldChecks {
    errors: Vec<FieldError>,
}

impl FieldChecks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records `message` against `field` unless `ok` holds.
    pub(crate) fn require(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub(crate) fn not_blank(&mut self, value: &str, field: &str) -> &mut Self {
        self.require(!value.trim().is_empty(), field, "must not be empty")
    }

    pub(crate) fn latitude(&mut self, value: f64, field: &str) -> &mut Self {
        self.require(valid_latitude(value), field, "must be between -90 and 90")
    }

    pub(crate) fn longitude(&mut self, value: f64, field: &str) -> &mut Self {
        self.require(valid_longitude(value), field, "must be between -180 and 180")
    }

    pub(crate) fn polygon(&mut self, points: &[GeoPoint], field: &str) -> &mut Self {
        self.require(
            points.len() >= MIN_POLYGON_VERTICES,
            field,
            "must have at least 3 vertices",
        );
        self.require(
            points.iter().all(GeoPoint::is_valid),
            field,
            "contains an out-of-range coordinate",
        )
    }

    /// Fails with [`ApiError::Validation`] if anything was recorded.
    pub(crate) fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn checks_accumulate_every_failure() {
        let result = FieldChecks::new()
            .not_blank(" ", "name")
            .latitude(91.0, "latitude")
            .longitude(10.0, "longitude")
            .finish();
        let Err(ApiError::Validation(errors)) = result else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.first().and_then(|e| e.field.as_deref()), Some("name"));
    }

    #[test]
    fn short_polygon_is_rejected() {
        let points = [
            GeoPoint { latitude: 0.0, longitude: 0.0 },
            GeoPoint { latitude: 1.0, longitude: 1.0 },
        ];
        assert!(FieldChecks::new().polygon(&points, "polygon").finish().is_err());
    }
}
