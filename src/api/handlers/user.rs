//! Account administration, restricted to SUPER_ADMIN.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, MessageResponse, Paginated, PaginationParams, UpdateRoleRequest, UserDto,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::UserId;
use crate::error::{ApiError, ErrorResponse};

/// `GET /users`: all accounts, newest first.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless SUPER_ADMIN.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    summary = "List users",
    security(("bearer" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated user list", body = Paginated<UserDto>),
        (status = 403, description = "Not an administrator", body = ErrorResponse),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (users, total) = state.auth.list_users(&actor, params.page()).await?;
    let data = users.into_iter().map(UserDto::from).collect();
    Ok(Json(Paginated::new(data, &params, total)))
}

/// `GET /users/{id}`: one account.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless SUPER_ADMIN, [`ApiError::NotFound`]
/// for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    summary = "Get user",
    security(("bearer" = [])),
    params(("id" = UserId, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User", body = ApiResponse<UserDto>),
        (status = 403, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.get_user(&actor, id).await?;
    Ok(Json(ApiResponse::ok(UserDto::from(user))))
}

/// `PATCH /users/{id}/role`: assign a role.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless SUPER_ADMIN, [`ApiError::NotFound`]
/// for an unknown id.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}/role",
    tag = "Users",
    summary = "Change a user's role",
    security(("bearer" = [])),
    params(("id" = UserId, Path, description = "User identifier")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<UserDto>),
        (status = 403, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(req): ApiJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.update_user_role(&actor, id, req.role).await?;
    Ok(Json(ApiResponse::ok(UserDto::from(user))))
}

/// `DELETE /users/{id}`: remove an account.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless SUPER_ADMIN, [`ApiError::NotFound`]
/// for an unknown id, [`ApiError::Conflict`] while the user still organizes
/// events.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    summary = "Delete user",
    security(("bearer" = [])),
    params(("id" = UserId, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 403, description = "Not an administrator", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "User still organizes events", body = ErrorResponse),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.delete_user(&actor, id).await?;
    Ok(Json(MessageResponse::new("user deleted")))
}

/// User administration routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/users/{id}/role", patch(update_user_role))
}
