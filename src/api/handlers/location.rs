//! Location ingestion, history, density and retention.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, BatchLocationRequest, BatchResult, CleanupParams, CleanupResult, DensityParams,
    HistoryParams, LocationDto, LocationRequest,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{EventId, ParticipantId, ParticipantLocation, ZoneId};
use crate::error::{ApiError, ErrorResponse};
use crate::service::{LocationInput, ZoneDensity};

fn to_dtos(locations: Vec<ParticipantLocation>) -> Vec<LocationDto> {
    locations.into_iter().map(LocationDto::from).collect()
}

/// `POST /locations`: record one ping and broadcast it to subscribers.
///
/// # Errors
///
/// Returns [`ApiError`] for out-of-range coordinates or an unknown
/// participant.
#[utoipa::path(
    post,
    path = "/api/v1/locations",
    tag = "Locations",
    summary = "Report location",
    description = "Stores the ping with the zone it falls into, refreshes the participant's last-seen time and pushes a `locationUpdate` to WebSocket subscribers of the event.",
    request_body = LocationRequest,
    responses(
        (status = 201, description = "Location stored", body = ApiResponse<LocationDto>),
        (status = 404, description = "Participant not found", body = ErrorResponse),
        (status = 422, description = "Invalid coordinates", body = ErrorResponse),
    )
)]
pub async fn update_location(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let location = state.locations.update_location(req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(LocationDto::from(location))),
    ))
}

/// `POST /locations/batch`: bulk ingestion without live updates.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless security staff or admin,
/// [`ApiError::Validation`] if any item has invalid coordinates.
#[utoipa::path(
    post,
    path = "/api/v1/locations/batch",
    tag = "Locations",
    summary = "Batch location upload",
    description = "Stores every ping whose participant still exists. No WebSocket messages are sent for batch uploads.",
    security(("bearer" = [])),
    request_body = BatchLocationRequest,
    responses(
        (status = 200, description = "Number of pings stored", body = ApiResponse<BatchResult>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 422, description = "Invalid coordinates", body = ErrorResponse),
    )
)]
pub async fn batch_update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(req): ApiJson<BatchLocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let items: Vec<LocationInput> = req.locations.into_iter().map(Into::into).collect();
    let stored = state.locations.batch_update(&actor, items).await?;
    Ok(Json(ApiResponse::ok(BatchResult { stored })))
}

/// `DELETE /locations/cleanup?days=N`: drop old pings.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless SUPER_ADMIN,
/// [`ApiError::Validation`] for `days` below 1.
#[utoipa::path(
    delete,
    path = "/api/v1/locations/cleanup",
    tag = "Locations",
    summary = "Delete old locations",
    security(("bearer" = [])),
    params(CleanupParams),
    responses(
        (status = 200, description = "Number of records deleted", body = ApiResponse<CleanupResult>),
        (status = 403, description = "Not an administrator", body = ErrorResponse),
        (status = 422, description = "Invalid retention", body = ErrorResponse),
    )
)]
pub async fn cleanup(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(params): ApiQuery<CleanupParams>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.locations.cleanup(&actor, params.days).await?;
    Ok(Json(ApiResponse::ok(CleanupResult { deleted })))
}

/// `GET /events/{id}/locations`: latest ping per active participant.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless organizer, security staff or
/// admin.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/locations",
    tag = "Locations",
    summary = "Latest locations of an event",
    security(("bearer" = [])),
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Latest location per active participant", body = ApiResponse<Vec<LocationDto>>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
    )
)]
pub async fn latest_by_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let locations = state.locations.latest_by_event(&actor, event_id).await?;
    Ok(Json(ApiResponse::ok(to_dtos(locations))))
}

/// `GET /participants/{id}/locations`: newest-first history.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless organizer, security staff or
/// admin.
#[utoipa::path(
    get,
    path = "/api/v1/participants/{id}/locations",
    tag = "Locations",
    summary = "Participant location history",
    security(("bearer" = [])),
    params(
        ("id" = ParticipantId, Path, description = "Participant identifier"),
        HistoryParams,
    ),
    responses(
        (status = 200, description = "Locations, newest first", body = ApiResponse<Vec<LocationDto>>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
    )
)]
pub async fn history(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(participant_id): ApiPath<ParticipantId>,
    ApiQuery(params): ApiQuery<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let locations = state
        .locations
        .history(&actor, participant_id, params.limit)
        .await?;
    Ok(Json(ApiResponse::ok(to_dtos(locations))))
}

/// `GET /zones/{id}/density`: distinct participants seen in a zone lately.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless organizer, security staff or
/// admin; [`ApiError::NotFound`] for an unknown zone.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{id}/density",
    tag = "Locations",
    summary = "Zone density",
    description = "Counts distinct participants with a location in the zone during the trailing window (default 5 minutes).",
    security(("bearer" = [])),
    params(
        ("id" = ZoneId, Path, description = "Zone identifier"),
        DensityParams,
    ),
    responses(
        (status = 200, description = "Density", body = ApiResponse<ZoneDensity>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
    )
)]
pub async fn zone_density(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(zone_id): ApiPath<ZoneId>,
    ApiQuery(params): ApiQuery<DensityParams>,
) -> Result<impl IntoResponse, ApiError> {
    let density = state
        .locations
        .zone_density(&actor, zone_id, params.minutes)
        .await?;
    Ok(Json(ApiResponse::ok(density)))
}

/// Location routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/locations", post(update_location))
        .route("/locations/batch", post(batch_update))
        .route("/locations/cleanup", delete(cleanup))
        .route("/events/{id}/locations", get(latest_by_event))
        .route("/participants/{id}/locations", get(history))
        .route("/zones/{id}/density", get(zone_density))
}
