//! Incident reports and keyword-based priority classification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, ParseEnumError, ParticipantId, ReportId, UserId};

const EMERGENCY_KEYWORDS: &[&str] = &[
    "fire",
    "medical",
    "emergency",
    "weapon",
    "gun",
    "knife",
    "bomb",
    "unconscious",
    "heart attack",
    "stampede",
];

const HIGH_KEYWORDS: &[&str] = &[
    "fight", "violence", "assault", "injury", "injured", "theft", "stolen", "blood",
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "crowd",
    "suspicious",
    "lost",
    "harassment",
    "drunk",
    "noise",
];

/// Triage status of a report. Any status may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// Newly filed.
    Pending,
    /// Reviewed by staff.
    Triaged,
    /// Being handled.
    InProgress,
    /// Handled.
    Resolved,
    /// Not actionable.
    Dismissed,
}

impl ReportStatus {
    /// Canonical upper-case name, as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Triaged => "TRIAGED",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Dismissed => "DISMISSED",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "TRIAGED" => Ok(Self::Triaged),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "RESOLVED" => Ok(Self::Resolved),
            "DISMISSED" => Ok(Self::Dismissed),
            other => Err(ParseEnumError::new("report status", other)),
        }
    }
}

/// Urgency of a report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportPriority {
    /// Default when no keyword matches.
    Low,
    /// Needs attention.
    Medium,
    /// Needs prompt response.
    High,
    /// Life or safety at immediate risk.
    Emergency,
}

impl ReportPriority {
    /// Canonical upper-case name, as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for ReportPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "EMERGENCY" => Ok(Self::Emergency),
            other => Err(ParseEnumError::new("report priority", other)),
        }
    }
}

/// Derives a priority from free text.
///
/// Matching is case-insensitive substring search. Tiers are checked in
/// order EMERGENCY, HIGH, MEDIUM and the first tier with any match wins.
#[must_use]
pub fn classify_priority(text: &str) -> ReportPriority {
    let text = text.to_lowercase();
    let tiers = [
        (ReportPriority::Emergency, EMERGENCY_KEYWORDS),
        (ReportPriority::High, HIGH_KEYWORDS),
        (ReportPriority::Medium, MEDIUM_KEYWORDS),
    ];
    tiers
        .into_iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map_or(ReportPriority::Low, |(priority, _)| priority)
}

/// An incident report tied to one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Report identifier.
    pub id: ReportId,
    /// Event the incident happened at.
    pub event_id: EventId,
    /// Reporting participant, if known.
    pub participant_id: Option<ParticipantId>,
    /// Reporting user, if authenticated.
    pub user_id: Option<UserId>,
    /// Short headline.
    pub title: Option<String>,
    /// Description of the incident.
    pub message: String,
    /// Incident latitude.
    pub latitude: Option<f64>,
    /// Incident longitude.
    pub longitude: Option<f64>,
    /// Triage status.
    pub status: ReportStatus,
    /// Urgency.
    pub priority: ReportPriority,
    /// Filing time.
    pub created_at: DateTime<Utc>,
    /// Last status/priority change.
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a report.
#[derive(Debug, Clone)]
pub struct NewReport {
    /// Pre-generated identifier.
    pub id: ReportId,
    /// Event the incident happened at.
    pub event_id: EventId,
    /// Reporting participant.
    pub participant_id: Option<ParticipantId>,
    /// Reporting user.
    pub user_id: Option<UserId>,
    /// Short headline.
    pub title: Option<String>,
    /// Description.
    pub message: String,
    /// Incident latitude.
    pub latitude: Option<f64>,
    /// Incident longitude.
    pub longitude: Option<f64>,
    /// Derived priority.
    pub priority: ReportPriority,
}

impl NewReport {
    /// Materializes the stored report, always PENDING.
    #[must_use]
    pub fn into_report(self, now: DateTime<Utc>) -> Report {
        Report {
            id: self.id,
            event_id: self.event_id,
            participant_id: self.participant_id,
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            latitude: self.latitude,
            longitude: self.longitude,
            status: ReportStatus::Pending,
            priority: self.priority,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Optional filters for report listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilter {
    /// Only reports in this status.
    pub status: Option<ReportStatus>,
    /// Only reports with this priority.
    pub priority: Option<ReportPriority>,
}

impl ReportFilter {
    /// Returns `true` if `report` passes the filter.
    #[must_use]
    pub fn matches(&self, report: &Report) -> bool {
        self.status.is_none_or(|s| s == report.status)
            && self.priority.is_none_or(|p| p == report.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_keyword_defaults_to_low() {
        assert_eq!(classify_priority("toilets are out of paper"), ReportPriority::Low);
        assert_eq!(classify_priority(""), ReportPriority::Low);
    }

    #[test]
    fn emergency_beats_lower_tiers() {
        assert_eq!(
            classify_priority("Big crowd near a FIRE by the stage"),
            ReportPriority::Emergency
        );
        assert_eq!(
            classify_priority("fight broke out, someone is unconscious"),
            ReportPriority::Emergency
        );
    }

    #[test]
    fn high_beats_medium() {
        assert_eq!(
            classify_priority("suspicious guy, phone stolen"),
            ReportPriority::High
        );
    }

    #[test]
    fn medium_tier() {
        assert_eq!(classify_priority("Lost child at gate B"), ReportPriority::Medium);
    }

    #[test]
    fn multi_word_keyword() {
        assert_eq!(
            classify_priority("possible Heart Attack near bar"),
            ReportPriority::Emergency
        );
    }

    #[test]
    fn filter_matches_all_when_empty() {
        let report = NewReport {
            id: ReportId::new(),
            event_id: EventId::new(),
            participant_id: None,
            user_id: None,
            title: None,
            message: "noise".to_string(),
            latitude: None,
            longitude: None,
            priority: ReportPriority::Medium,
        }
        .into_report(Utc::now());
        assert!(ReportFilter::default().matches(&report));
        assert!(
            ReportFilter {
                status: Some(ReportStatus::Pending),
                priority: Some(ReportPriority::Medium),
            }
            .matches(&report)
        );
        assert!(
            !ReportFilter {
                status: None,
                priority: Some(ReportPriority::Emergency),
            }
            .matches(&report)
        );
    }
}
