//! Joining events, presence and per-event participant listings.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ActiveCountDto, ApiResponse, JoinByCodeRequest, JoinEventRequest, ParticipantDto,
    ParticipantListParams,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::domain::{EventId, ParticipantId};
use crate::error::{ApiError, ErrorResponse};

/// `POST /participants/join`: join an event from a device.
///
/// # Errors
///
/// Returns [`ApiError`] for an unknown event or one that is not PUBLISHED
/// or ONGOING.
#[utoipa::path(
    post,
    path = "/api/v1/participants/join",
    tag = "Participants",
    summary = "Join an event",
    description = "Idempotent per (event, device): an active membership is returned unchanged and an inactive one is reactivated. A valid bearer token links the membership to the caller's account.",
    request_body = JoinEventRequest,
    responses(
        (status = 201, description = "Joined", body = ApiResponse<ParticipantDto>),
        (status = 400, description = "Event not open for joining", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn join_event(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    ApiJson(req): ApiJson<JoinEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (event_id, request) = req.into_join(actor.map(|a| a.user_id));
    let participant = state.participants.join(event_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ParticipantDto::from(participant))),
    ))
}

/// `POST /participants/join-by-code`: join using the event's join code.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown code, otherwise as
/// [`join_event`].
#[utoipa::path(
    post,
    path = "/api/v1/participants/join-by-code",
    tag = "Participants",
    summary = "Join an event by code",
    request_body = JoinByCodeRequest,
    responses(
        (status = 201, description = "Joined", body = ApiResponse<ParticipantDto>),
        (status = 400, description = "Event not open for joining", body = ErrorResponse),
        (status = 404, description = "Unknown join code", body = ErrorResponse),
    )
)]
pub async fn join_by_code(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    ApiJson(req): ApiJson<JoinByCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (code, request) = req.into_join(actor.map(|a| a.user_id));
    let participant = state.participants.join_by_code(&code, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ParticipantDto::from(participant))),
    ))
}

/// `GET /participants/{id}`: one participant.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/participants/{id}",
    tag = "Participants",
    summary = "Get participant",
    params(("id" = ParticipantId, Path, description = "Participant identifier")),
    responses(
        (status = 200, description = "Participant", body = ApiResponse<ParticipantDto>),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn get_participant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ParticipantId>,
) -> Result<impl IntoResponse, ApiError> {
    let participant = state.participants.get(id).await?;
    Ok(Json(ApiResponse::ok(ParticipantDto::from(participant))))
}

/// `POST /participants/{id}/leave`: mark inactive.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown id.
#[utoipa::path(
    post,
    path = "/api/v1/participants/{id}/leave",
    tag = "Participants",
    summary = "Leave event",
    params(("id" = ParticipantId, Path, description = "Participant identifier")),
    responses(
        (status = 200, description = "Left the event", body = ApiResponse<ParticipantDto>),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn leave_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ParticipantId>,
) -> Result<impl IntoResponse, ApiError> {
    let participant = state.participants.leave(id).await?;
    Ok(Json(ApiResponse::with_message(
        "left event",
        ParticipantDto::from(participant),
    )))
}

/// `POST /participants/{id}/heartbeat`: refresh last-seen time.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown id.
#[utoipa::path(
    post,
    path = "/api/v1/participants/{id}/heartbeat",
    tag = "Participants",
    summary = "Heartbeat",
    params(("id" = ParticipantId, Path, description = "Participant identifier")),
    responses(
        (status = 200, description = "Presence refreshed", body = ApiResponse<ParticipantDto>),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn heartbeat(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ParticipantId>,
) -> Result<impl IntoResponse, ApiError> {
    let participant = state.participants.heartbeat(id).await?;
    Ok(Json(ApiResponse::ok(ParticipantDto::from(participant))))
}

/// `GET /events/{id}/participants`: members of an event in join order.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless organizer, security staff or
/// admin; [`ApiError::NotFound`] for an unknown event.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/participants",
    tag = "Participants",
    summary = "List event participants",
    security(("bearer" = [])),
    params(
        ("id" = EventId, Path, description = "Event identifier"),
        ParticipantListParams,
    ),
    responses(
        (status = 200, description = "Participants", body = ApiResponse<Vec<ParticipantDto>>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_participants(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(event_id): ApiPath<EventId>,
    ApiQuery(params): ApiQuery<ParticipantListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let participants = state
        .participants
        .list(&actor, event_id, params.active_only)
        .await?;
    let data: Vec<ParticipantDto> = participants.into_iter().map(ParticipantDto::from).collect();
    Ok(Json(ApiResponse::ok(data)))
}

/// `GET /events/{id}/participants/count`: active participant count.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown event.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/participants/count",
    tag = "Participants",
    summary = "Active participant count",
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Count", body = ApiResponse<ActiveCountDto>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn active_count(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let active_participants = state.participants.active_count(event_id).await?;
    Ok(Json(ApiResponse::ok(ActiveCountDto {
        event_id,
        active_participants,
    })))
}

/// Participant routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/participants/join", post(join_event))
        .route("/participants/join-by-code", post(join_by_code))
        .route("/participants/{id}", get(get_participant))
        .route("/participants/{id}/leave", post(leave_event))
        .route("/participants/{id}/heartbeat", post(heartbeat))
        .route("/events/{id}/participants", get(list_participants))
        .route("/events/{id}/participants/count", get(active_count))
}
