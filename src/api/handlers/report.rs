//! Incident reports.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, CreateReportRequest, MessageResponse, PriorityRequest, ReportDto,
    ReportFilterParams, StatusRequest,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::domain::{EventId, Report, ReportId};
use crate::error::{ApiError, ErrorResponse};

fn to_dtos(reports: Vec<Report>) -> Vec<ReportDto> {
    reports.into_iter().map(ReportDto::from).collect()
}

/// `POST /reports`: file an incident report.
///
/// # Errors
///
/// Returns [`ApiError`] for a blank message, bad coordinates, an unknown
/// event or participant.
#[utoipa::path(
    post,
    path = "/api/v1/reports",
    tag = "Reports",
    summary = "File a report",
    description = "Creates a PENDING report. Priority is derived from keywords in the title and message. A valid bearer token records the caller as reporter.",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report filed", body = ApiResponse<ReportDto>),
        (status = 400, description = "Participant belongs to another event", body = ErrorResponse),
        (status = 404, description = "Event or participant not found", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
    )
)]
pub async fn create_report(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    ApiJson(req): ApiJson<CreateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.reports.create(actor.as_ref(), req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ReportDto::from(report))),
    ))
}

/// `GET /reports/{id}`: one report.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless security staff or admin,
/// [`ApiError::NotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    tag = "Reports",
    summary = "Get report",
    security(("bearer" = [])),
    params(("id" = ReportId, Path, description = "Report identifier")),
    responses(
        (status = 200, description = "Report", body = ApiResponse<ReportDto>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
    )
)]
pub async fn get_report(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<ReportId>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.reports.get(&actor, id).await?;
    Ok(Json(ApiResponse::ok(ReportDto::from(report))))
}

/// `PATCH /reports/{id}/status`: set the handling status.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless security staff or admin,
/// [`ApiError::NotFound`] for an unknown id.
#[utoipa::path(
    patch,
    path = "/api/v1/reports/{id}/status",
    tag = "Reports",
    summary = "Set report status",
    description = "Any status may follow any other.",
    security(("bearer" = [])),
    params(("id" = ReportId, Path, description = "Report identifier")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Updated report", body = ApiResponse<ReportDto>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<ReportId>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.reports.update_status(&actor, id, req.status).await?;
    Ok(Json(ApiResponse::ok(ReportDto::from(report))))
}

/// `PATCH /reports/{id}/priority`: override the derived priority.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless security staff or admin,
/// [`ApiError::NotFound`] for an unknown id.
#[utoipa::path(
    patch,
    path = "/api/v1/reports/{id}/priority",
    tag = "Reports",
    summary = "Set report priority",
    security(("bearer" = [])),
    params(("id" = ReportId, Path, description = "Report identifier")),
    request_body = PriorityRequest,
    responses(
        (status = 200, description = "Updated report", body = ApiResponse<ReportDto>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
    )
)]
pub async fn update_priority(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<ReportId>,
    ApiJson(req): ApiJson<PriorityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .reports
        .update_priority(&actor, id, req.priority)
        .await?;
    Ok(Json(ApiResponse::ok(ReportDto::from(report))))
}

/// `DELETE /reports/{id}`: remove a report.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless SUPER_ADMIN,
/// [`ApiError::NotFound`] for an unknown id.
#[utoipa::path(
    delete,
    path = "/api/v1/reports/{id}",
    tag = "Reports",
    summary = "Delete report",
    security(("bearer" = [])),
    params(("id" = ReportId, Path, description = "Report identifier")),
    responses(
        (status = 200, description = "Report deleted", body = MessageResponse),
        (status = 403, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
    )
)]
pub async fn delete_report(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<ReportId>,
) -> Result<impl IntoResponse, ApiError> {
    state.reports.delete(&actor, id).await?;
    Ok(Json(MessageResponse::new("report deleted")))
}

/// `GET /events/{id}/reports`: reports of an event, newest first.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless organizer, security staff or
/// admin.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/reports",
    tag = "Reports",
    summary = "List event reports",
    security(("bearer" = [])),
    params(
        ("id" = EventId, Path, description = "Event identifier"),
        ReportFilterParams,
    ),
    responses(
        (status = 200, description = "Reports", body = ApiResponse<Vec<ReportDto>>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
    )
)]
pub async fn list_reports(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(event_id): ApiPath<EventId>,
    ApiQuery(filter): ApiQuery<ReportFilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let reports = state
        .reports
        .list(&actor, event_id, filter.into())
        .await?;
    Ok(Json(ApiResponse::ok(to_dtos(reports))))
}

/// `GET /events/{id}/reports/emergency`: EMERGENCY reports only.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless organizer, security staff or
/// admin.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/reports/emergency",
    tag = "Reports",
    summary = "Emergency reports",
    security(("bearer" = [])),
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Emergency reports", body = ApiResponse<Vec<ReportDto>>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
    )
)]
pub async fn emergency_reports(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let reports = state.reports.emergencies(&actor, event_id).await?;
    Ok(Json(ApiResponse::ok(to_dtos(reports))))
}

/// Report routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports", post(create_report))
        .route("/reports/{id}", get(get_report).delete(delete_report))
        .route("/reports/{id}/status", patch(update_status))
        .route("/reports/{id}/priority", patch(update_priority))
        .route("/events/{id}/reports", get(list_reports))
        .route("/events/{id}/reports/emergency", get(emergency_reports))
}
