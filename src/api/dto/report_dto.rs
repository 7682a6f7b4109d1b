//! Incident report DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    EventId, ParticipantId, Report, ReportFilter, ReportId, ReportPriority, ReportStatus, UserId,
};
use crate::service::CreateReport;

/// Request body for `POST /reports`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    /// Event the incident happened at.
    pub event_id: EventId,
    /// Reporting participant.
    #[serde(default)]
    pub participant_id: Option<ParticipantId>,
    /// Short headline.
    #[serde(default)]
    pub title: Option<String>,
    /// What happened. Priority is derived from title and message.
    pub message: String,
    /// Incident latitude.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Incident longitude.
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl From<CreateReportRequest> for CreateReport {
    fn from(req: CreateReportRequest) -> Self {
        Self {
            event_id: req.event_id,
            participant_id: req.participant_id,
            title: req.title,
            message: req.message,
            latitude: req.latitude,
            longitude: req.longitude,
        }
    }
}

/// Request body for `PATCH /reports/{id}/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusRequest {
    /// New status.
    pub status: ReportStatus,
}

/// Request body for `PATCH /reports/{id}/priority`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PriorityRequest {
    /// New priority.
    pub priority: ReportPriority,
}

/// Query parameters for `GET /events/{id}/reports`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportFilterParams {
    /// Only reports in this status.
    #[serde(default)]
    pub status: Option<ReportStatus>,
    /// Only reports with this priority.
    #[serde(default)]
    pub priority: Option<ReportPriority>,
}

impl From<ReportFilterParams> for ReportFilter {
    fn from(params: ReportFilterParams) -> Self {
        Self {
            status: params.status,
            priority: params.priority,
        }
    }
}

/// Report representation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportDto {
    /// Report identifier.
    pub id: ReportId,
    /// Event.
    pub event_id: EventId,
    /// Reporting participant.
    pub participant_id: Option<ParticipantId>,
    /// Reporting account.
    pub user_id: Option<UserId>,
    /// Headline.
    pub title: Option<String>,
    /// Description.
    pub message: String,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// Handling status.
    pub status: ReportStatus,
    /// Urgency.
    pub priority: ReportPriority,
    /// Filing time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for ReportDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            event_id: r.event_id,
            participant_id: r.participant_id,
            user_id: r.user_id,
            title: r.title,
            message: r.message,
            latitude: r.latitude,
            longitude: r.longitude,
            status: r.status,
            priority: r.priority,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
