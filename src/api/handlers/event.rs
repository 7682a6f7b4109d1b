//! Event CRUD, public listings and lifecycle transitions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, CreateEventRequest, EventDto, EventFilterParams, MessageResponse, Paginated,
    PaginationParams, UpdateEventRequest,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{Actor, Event, EventId, EventTransition};
use crate::error::{ApiError, ErrorResponse};

fn to_dtos(events: Vec<Event>) -> Vec<EventDto> {
    events.into_iter().map(EventDto::from).collect()
}

/// `POST /events`: create a DRAFT event organized by the caller.
///
/// # Errors
///
/// Returns [`ApiError`] for a non-organizer caller or invalid fields.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create an event",
    description = "Creates an event in DRAFT status with a generated join code. Requires EVENT_ORGANIZER or SUPER_ADMIN.",
    security(("bearer" = [])),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = ApiResponse<EventDto>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(req): ApiJson<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.events.create(&actor, req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(EventDto::from(event))),
    ))
}

/// `GET /events`: paginated listing, optionally by status.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failures.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    description = "Returns events ordered by start date, optionally filtered by status.",
    params(PaginationParams, EventFilterParams),
    responses(
        (status = 200, description = "Paginated event list", body = Paginated<EventDto>),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PaginationParams>,
    ApiQuery(filter): ApiQuery<EventFilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (events, total) = state.events.list(filter.status, params.page()).await?;
    Ok(Json(Paginated::new(to_dtos(events), &params, total)))
}

/// `GET /events/upcoming`: published events that have not started.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failures.
#[utoipa::path(
    get,
    path = "/api/v1/events/upcoming",
    tag = "Events",
    summary = "Upcoming events",
    description = "PUBLISHED events whose start date is in the future, soonest first.",
    responses(
        (status = 200, description = "Upcoming events", body = ApiResponse<Vec<EventDto>>),
    )
)]
pub async fn upcoming_events(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let events = state.events.upcoming().await?;
    Ok(Json(ApiResponse::ok(to_dtos(events))))
}

/// `GET /events/ongoing`: running events.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failures.
#[utoipa::path(
    get,
    path = "/api/v1/events/ongoing",
    tag = "Events",
    summary = "Ongoing events",
    description = "ONGOING events whose schedule contains the current time.",
    responses(
        (status = 200, description = "Ongoing events", body = ApiResponse<Vec<EventDto>>),
    )
)]
pub async fn ongoing_events(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let events = state.events.ongoing().await?;
    Ok(Json(ApiResponse::ok(to_dtos(events))))
}

/// `GET /events/mine`: events organized by the caller.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless organizer or admin.
#[utoipa::path(
    get,
    path = "/api/v1/events/mine",
    tag = "Events",
    summary = "My events",
    security(("bearer" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated event list", body = Paginated<EventDto>),
        (status = 403, description = "Role not permitted", body = ErrorResponse),
    )
)]
pub async fn my_events(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (events, total) = state.events.mine(&actor, params.page()).await?;
    Ok(Json(Paginated::new(to_dtos(events), &params, total)))
}

/// `GET /events/code/{code}`: resolve a join code.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown code.
#[utoipa::path(
    get,
    path = "/api/v1/events/code/{code}",
    tag = "Events",
    summary = "Find event by join code",
    params(("code" = String, Path, description = "Join code, case-insensitive")),
    responses(
        (status = 200, description = "Event", body = ApiResponse<EventDto>),
        (status = 404, description = "Unknown code", body = ErrorResponse),
    )
)]
pub async fn event_by_code(
    State(state): State<AppState>,
    ApiPath(code): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.events.get_by_join_code(&code).await?;
    Ok(Json(ApiResponse::ok(EventDto::from(event))))
}

/// `GET /events/{id}`: one event.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get event",
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Event", body = ApiResponse<EventDto>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.events.get(id).await?;
    Ok(Json(ApiResponse::ok(EventDto::from(event))))
}

/// `PATCH /events/{id}`: partial update by the organizer or an admin.
///
/// # Errors
///
/// Returns [`ApiError`] for invalid fields, an unknown id or a caller who
/// does not own the event.
#[utoipa::path(
    patch,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Update event",
    description = "Updates the given fields. `status` only accepts CANCELLED; publish, start and complete have their own endpoints.",
    security(("bearer" = [])),
    params(("id" = EventId, Path, description = "Event identifier")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated event", body = ApiResponse<EventDto>),
        (status = 403, description = "Not the organizer", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<EventId>,
    ApiJson(req): ApiJson<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.events.update(&actor, id, req.into()).await?;
    Ok(Json(ApiResponse::ok(EventDto::from(event))))
}

/// `DELETE /events/{id}`: remove an event with its zones, participants and
/// reports.
///
/// # Errors
///
/// Returns [`ApiError`] for an unknown id or a caller who does not own the
/// event.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Delete event",
    security(("bearer" = [])),
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Event deleted", body = MessageResponse),
        (status = 403, description = "Not the organizer", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    state.events.delete(&actor, id).await?;
    Ok(Json(MessageResponse::new("event deleted")))
}

async fn transition(
    state: &AppState,
    actor: &Actor,
    id: EventId,
    transition: EventTransition,
) -> Result<Json<ApiResponse<EventDto>>, ApiError> {
    let event = state.events.transition(actor, id, transition).await?;
    Ok(Json(ApiResponse::with_message(
        format!("event is now {}", event.status),
        EventDto::from(event),
    )))
}

/// `POST /events/{id}/publish`: DRAFT to PUBLISHED.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] unless the event is DRAFT, and the
/// usual ownership errors.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/publish",
    tag = "Events",
    summary = "Publish event",
    description = "Moves a DRAFT event to PUBLISHED so participants can join.",
    security(("bearer" = [])),
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Event published", body = ApiResponse<EventDto>),
        (status = 400, description = "Event is not DRAFT", body = ErrorResponse),
        (status = 403, description = "Not the organizer", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn publish_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    transition(&state, &actor, id, EventTransition::Publish).await
}

/// `POST /events/{id}/start`: mark ONGOING.
///
/// # Errors
///
/// Returns [`ApiError`] for an unknown id or a caller who does not own the
/// event.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/start",
    tag = "Events",
    summary = "Start event",
    security(("bearer" = [])),
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Event started", body = ApiResponse<EventDto>),
        (status = 403, description = "Not the organizer", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn start_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    transition(&state, &actor, id, EventTransition::Start).await
}

/// `POST /events/{id}/complete`: mark COMPLETED.
///
/// # Errors
///
/// Returns [`ApiError`] for an unknown id or a caller who does not own the
/// event.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/complete",
    tag = "Events",
    summary = "Complete event",
    security(("bearer" = [])),
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Event completed", body = ApiResponse<EventDto>),
        (status = 403, description = "Not the organizer", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn complete_event(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    transition(&state, &actor, id, EventTransition::Complete).await
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/upcoming", get(upcoming_events))
        .route("/events/ongoing", get(ongoing_events))
        .route("/events/mine", get(my_events))
        .route("/events/code/{code}", get(event_by_code))
        .route(
            "/events/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/events/{id}/publish", post(publish_event))
        .route("/events/{id}/start", post(start_event))
        .route("/events/{id}/complete", post(complete_event))
}
