//! Zone management and risk levels.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, CreateZoneRequest, MessageResponse, RiskLevelRequest, UpdateZoneRequest, ZoneDto,
};
use crate::api::extract::{ApiJson, ApiPath};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{EventId, Zone, ZoneId};
use crate::error::{ApiError, ErrorResponse};

fn to_dtos(zones: Vec<Zone>) -> Vec<ZoneDto> {
    zones.into_iter().map(ZoneDto::from).collect()
}

/// `POST /zones`: add a zone to an event.
///
/// # Errors
///
/// Returns [`ApiError`] for an invalid polygon, an unknown event or a caller
/// who does not organize it.
#[utoipa::path(
    post,
    path = "/api/v1/zones",
    tag = "Zones",
    summary = "Create zone",
    description = "Adds a polygonal zone (at least 3 vertices) to an event. Requires the event's organizer or SUPER_ADMIN.",
    security(("bearer" = [])),
    request_body = CreateZoneRequest,
    responses(
        (status = 201, description = "Zone created", body = ApiResponse<ZoneDto>),
        (status = 403, description = "Not the organizer", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 422, description = "Invalid polygon or fields", body = ErrorResponse),
    )
)]
pub async fn create_zone(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(req): ApiJson<CreateZoneRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let zone = state.zones.create(&actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(ZoneDto::from(zone)))))
}

/// `GET /zones/{id}`: one zone.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{id}",
    tag = "Zones",
    summary = "Get zone",
    params(("id" = ZoneId, Path, description = "Zone identifier")),
    responses(
        (status = 200, description = "Zone", body = ApiResponse<ZoneDto>),
        (status = 404, description = "Zone not found", body = ErrorResponse),
    )
)]
pub async fn get_zone(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ZoneId>,
) -> Result<impl IntoResponse, ApiError> {
    let zone = state.zones.get(id).await?;
    Ok(Json(ApiResponse::ok(ZoneDto::from(zone))))
}

/// `PATCH /zones/{id}`: partial update.
///
/// # Errors
///
/// Returns [`ApiError`] for invalid fields, an unknown zone or a caller who
/// does not organize its event.
#[utoipa::path(
    patch,
    path = "/api/v1/zones/{id}",
    tag = "Zones",
    summary = "Update zone",
    security(("bearer" = [])),
    params(("id" = ZoneId, Path, description = "Zone identifier")),
    request_body = UpdateZoneRequest,
    responses(
        (status = 200, description = "Updated zone", body = ApiResponse<ZoneDto>),
        (status = 403, description = "Not the organizer", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
    )
)]
pub async fn update_zone(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<ZoneId>,
    ApiJson(req): ApiJson<UpdateZoneRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let zone = state.zones.update(&actor, id, req.into()).await?;
    Ok(Json(ApiResponse::ok(ZoneDto::from(zone))))
}

/// `DELETE /zones/{id}`: remove a zone. Stored locations keep their
/// coordinates and lose the zone reference.
///
/// # Errors
///
/// Returns [`ApiError`] for an unknown zone or a caller who does not
/// organize its event.
#[utoipa::path(
    delete,
    path = "/api/v1/zones/{id}",
    tag = "Zones",
    summary = "Delete zone",
    security(("bearer" = [])),
    params(("id" = ZoneId, Path, description = "Zone identifier")),
    responses(
        (status = 200, description = "Zone deleted", body = MessageResponse),
        (status = 403, description = "Not the organizer", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
    )
)]
pub async fn delete_zone(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<ZoneId>,
) -> Result<impl IntoResponse, ApiError> {
    state.zones.delete(&actor, id).await?;
    Ok(Json(MessageResponse::new("zone deleted")))
}

/// `PATCH /zones/{id}/risk-level`: change the risk level.
///
/// # Errors
///
/// Returns [`ApiError`] for an unknown zone or a caller who is neither
/// security staff nor the event's organizer or an admin.
#[utoipa::path(
    patch,
    path = "/api/v1/zones/{id}/risk-level",
    tag = "Zones",
    summary = "Set risk level",
    description = "Security staff may change the risk level of any zone; organizers only of their own events.",
    security(("bearer" = [])),
    params(("id" = ZoneId, Path, description = "Zone identifier")),
    request_body = RiskLevelRequest,
    responses(
        (status = 200, description = "Updated zone", body = ApiResponse<ZoneDto>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
    )
)]
pub async fn update_risk_level(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<ZoneId>,
    ApiJson(req): ApiJson<RiskLevelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let zone = state
        .zones
        .update_risk_level(&actor, id, req.risk_level)
        .await?;
    Ok(Json(ApiResponse::ok(ZoneDto::from(zone))))
}

/// `GET /events/{id}/zones`: all zones of an event.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown event.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/zones",
    tag = "Zones",
    summary = "List event zones",
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Zones", body = ApiResponse<Vec<ZoneDto>>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_zones(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let zones = state.zones.list(event_id).await?;
    Ok(Json(ApiResponse::ok(to_dtos(zones))))
}

/// `GET /events/{id}/zones/critical`: CRITICAL zones, then HIGH.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless organizer, security staff or
/// admin.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/zones/critical",
    tag = "Zones",
    summary = "Critical zones",
    description = "Zones at CRITICAL risk followed by zones at HIGH risk.",
    security(("bearer" = [])),
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Zones", body = ApiResponse<Vec<ZoneDto>>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
    )
)]
pub async fn critical_zones(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let zones = state.zones.critical(&actor, event_id).await?;
    Ok(Json(ApiResponse::ok(to_dtos(zones))))
}

/// Zone routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/zones", post(create_zone))
        .route(
            "/zones/{id}",
            get(get_zone).patch(update_zone).delete(delete_zone),
        )
        .route("/zones/{id}/risk-level", patch(update_risk_level))
        .route("/events/{id}/zones", get(list_zones))
        .route("/events/{id}/zones/critical", get(critical_zones))
}
