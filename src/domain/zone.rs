//! Zones: named polygonal sub-areas of an event, with a risk level.
//!
//! Incoming location pings are classified into at most one zone. Zones
//! may overlap; the smallest containing zone wins, ties broken by the
//! earliest creation time.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use geo::{Area, Contains, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, ParseEnumError, ZoneId};

/// Minimum number of vertices of a zone boundary.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Risk classification of a zone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Normal conditions.
    Low,
    /// Elevated attention.
    Medium,
    /// Active monitoring required.
    High,
    /// Immediate intervention.
    Critical,
}

impl RiskLevel {
    /// Canonical upper-case name, as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(ParseEnumError::new("risk level", other)),
        }
    }
}

/// WGS-84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    /// Latitude in degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub longitude: f64,
}

impl GeoPoint {
    /// Returns `true` if both components are finite and in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        valid_latitude(self.latitude) && valid_longitude(self.longitude)
    }
}

/// Returns `true` for a finite latitude in `[-90, 90]`.
#[must_use]
pub fn valid_latitude(lat: f64) -> bool {
    lat.is_finite() && (-90.0..=90.0).contains(&lat)
}

/// Returns `true` for a finite longitude in `[-180, 180]`.
#[must_use]
pub fn valid_longitude(lng: f64) -> bool {
    lng.is_finite() && (-180.0..=180.0).contains(&lng)
}

/// A named sub-area of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Zone identifier.
    pub id: ZoneId,
    /// Owning event.
    pub event_id: EventId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Boundary vertices, in order. The ring is closed implicitly.
    pub polygon: Vec<GeoPoint>,
    /// Current risk classification.
    pub risk_level: RiskLevel,
    /// Optional head-count capacity.
    pub capacity: Option<i32>,
    /// Display color (e.g. `#FF0000`).
    pub color: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Zone {
    /// Boundary as a `geo` polygon, with x = longitude and y = latitude.
    #[must_use]
    pub fn boundary(&self) -> Polygon<f64> {
        let ring: Vec<(f64, f64)> = self
            .polygon
            .iter()
            .map(|p| (p.longitude, p.latitude))
            .collect();
        Polygon::new(LineString::from(ring), Vec::new())
    }

    /// Returns `true` if the point lies strictly inside the boundary.
    /// Points exactly on an edge are outside.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.polygon.len() >= MIN_POLYGON_VERTICES
            && self.boundary().contains(&Point::new(longitude, latitude))
    }

    /// Planar area of the boundary in square degrees, used only to rank
    /// overlapping zones.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.boundary().unsigned_area()
    }
}

/// Picks the zone a point falls into.
///
/// Among all zones containing the point, the one with the smallest area
/// wins; equal areas fall back to the earliest `created_at`, then to the
/// zone id. Returns `None` if no zone contains the point.
#[must_use]
pub fn classify_point(zones: &[Zone], latitude: f64, longitude: f64) -> Option<&Zone> {
    zones
        .iter()
        .filter(|zone| zone.contains(latitude, longitude))
        .map(|zone| (zone.area(), zone))
        .min_by(|(area_a, a), (area_b, b)| {
            area_a
                .partial_cmp(area_b)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        })
        .map(|(_, zone)| zone)
}

/// Insert payload for a new zone.
#[derive(Debug, Clone)]
pub struct NewZone {
    /// Pre-generated identifier.
    pub id: ZoneId,
    /// Owning event.
    pub event_id: EventId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Boundary vertices.
    pub polygon: Vec<GeoPoint>,
    /// Initial risk level.
    pub risk_level: RiskLevel,
    /// Optional head-count capacity.
    pub capacity: Option<i32>,
    /// Display color.
    pub color: Option<String>,
}

impl NewZone {
    /// Materializes the stored zone at `now`.
    #[must_use]
    pub fn into_zone(self, now: DateTime<Utc>) -> Zone {
        Zone {
            id: self.id,
            event_id: self.event_id,
            name: self.name,
            description: self.description,
            polygon: self.polygon,
            risk_level: self.risk_level,
            capacity: self.capacity,
            color: self.color,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a zone. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ZoneChanges {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New boundary.
    pub polygon: Option<Vec<GeoPoint>>,
    /// New risk level.
    pub risk_level: Option<RiskLevel>,
    /// New capacity.
    pub capacity: Option<i32>,
    /// New color.
    pub color: Option<String>,
}

impl ZoneChanges {
    /// A change that only sets the risk level.
    #[must_use]
    pub fn risk_level(risk_level: RiskLevel) -> Self {
        Self {
            risk_level: Some(risk_level),
            ..Self::default()
        }
    }

    /// Applies the changes to an in-memory zone.
    pub fn apply_to(&self, zone: &mut Zone) {
        if let Some(name) = &self.name {
            zone.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            zone.description = Some(description.clone());
        }
        if let Some(polygon) = &self.polygon {
            zone.polygon.clone_from(polygon);
        }
        if let Some(risk_level) = self.risk_level {
            zone.risk_level = risk_level;
        }
        if let Some(capacity) = self.capacity {
            zone.capacity = Some(capacity);
        }
        if let Some(color) = &self.color {
            zone.color = Some(color.clone());
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn square(min: f64, max: f64, created_at: DateTime<Utc>) -> Zone {
        let polygon = vec![
            GeoPoint { latitude: min, longitude: min },
            GeoPoint { latitude: min, longitude: max },
            GeoPoint { latitude: max, longitude: max },
            GeoPoint { latitude: max, longitude: min },
        ];
        Zone {
            id: ZoneId::new(),
            event_id: EventId::new(),
            name: format!("{min}-{max}"),
            description: None,
            polygon,
            risk_level: RiskLevel::Low,
            capacity: None,
            color: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn contains_interior_point_only() {
        let zone = square(0.0, 10.0, Utc::now());
        assert!(zone.contains(5.0, 5.0));
        assert!(!zone.contains(15.0, 5.0));
        assert!(!zone.contains(0.0, 5.0), "edge points are outside");
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let mut zone = square(0.0, 10.0, Utc::now());
        zone.polygon.truncate(2);
        assert!(!zone.contains(5.0, 5.0));
    }

    #[test]
    fn smallest_overlapping_zone_wins() {
        let now = Utc::now();
        let outer = square(0.0, 10.0, now);
        let inner = square(4.0, 6.0, now + Duration::seconds(5));
        let zones = vec![outer.clone(), inner.clone()];

        let Some(hit) = classify_point(&zones, 5.0, 5.0) else {
            panic!("point should be classified");
        };
        assert_eq!(hit.id, inner.id);

        let Some(hit) = classify_point(&zones, 1.0, 1.0) else {
            panic!("point should be classified");
        };
        assert_eq!(hit.id, outer.id);
    }

    #[test]
    fn equal_area_ties_go_to_earliest_zone() {
        let now = Utc::now();
        let later = square(0.0, 10.0, now + Duration::seconds(1));
        let earlier = square(0.0, 10.0, now);
        let zones = vec![later, earlier.clone()];

        let Some(hit) = classify_point(&zones, 5.0, 5.0) else {
            panic!("point should be classified");
        };
        assert_eq!(hit.id, earlier.id);
    }

    #[test]
    fn point_outside_every_zone_is_unclassified() {
        let zones = vec![square(0.0, 1.0, Utc::now())];
        assert!(classify_point(&zones, 50.0, 50.0).is_none());
        assert!(classify_point(&[], 0.5, 0.5).is_none());
    }

    #[test]
    fn coordinate_ranges() {
        assert!(GeoPoint { latitude: 90.0, longitude: -180.0 }.is_valid());
        assert!(!GeoPoint { latitude: 90.1, longitude: 0.0 }.is_valid());
        assert!(!GeoPoint { latitude: f64::NAN, longitude: 0.0 }.is_valid());
    }

    #[test]
    fn risk_levels_order_by_severity() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
    }
}
