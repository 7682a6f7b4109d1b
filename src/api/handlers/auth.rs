//! Registration, login, token refresh and the caller's own profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse,
    RefreshRequest, RegisterRequest, UpdateProfileRequest, UserDto,
};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::auth::{AuthUser, TokenPair};
use crate::error::{ApiError, ErrorResponse};

/// `POST /auth/register`: create an account and sign in.
///
/// # Errors
///
/// Returns [`ApiError`] on invalid fields, a taken email or a SUPER_ADMIN
/// role request.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    summary = "Register an account",
    description = "Creates a user with a hashed password and returns an access/refresh token pair. The SUPER_ADMIN role cannot be self-selected.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<AuthResponse>),
        (status = 403, description = "Role not self-selectable", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, tokens) = state.auth.register(req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "registration successful",
            AuthResponse::new(user, tokens),
        )),
    ))
}

/// `POST /auth/login`: exchange credentials for tokens.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] on unknown email or wrong password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    summary = "Log in",
    description = "Verifies the password and issues an access token and a refresh token.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, tokens) = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(ApiResponse::ok(AuthResponse::new(user, tokens))))
}

/// `POST /auth/refresh`: issue a new access token.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] for an invalid, expired or non-refresh
/// token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    summary = "Refresh the access token",
    description = "Validates a refresh token and returns a new access token. The refresh token itself is returned unchanged.",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = ApiResponse<TokenPair>),
        (status = 401, description = "Invalid refresh token", body = ErrorResponse),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(ApiResponse::ok(tokens)))
}

/// `GET /auth/me`: the caller's profile.
///
/// # Errors
///
/// Returns [`ApiError`] without a valid token or if the account is gone.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    summary = "Current user",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Profile", body = ApiResponse<UserDto>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.me(&actor).await?;
    Ok(Json(ApiResponse::ok(UserDto::from(user))))
}

/// `PATCH /auth/me`: update name or phone.
///
/// # Errors
///
/// Returns [`ApiError`] without a valid token or on a blank name.
#[utoipa::path(
    patch,
    path = "/api/v1/auth/me",
    tag = "Auth",
    summary = "Update own profile",
    security(("bearer" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<UserDto>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.auth.update_profile(&actor, req.name, req.phone).await?;
    Ok(Json(ApiResponse::ok(UserDto::from(user))))
}

/// `POST /auth/change-password`: replace the caller's password.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] if the current password does not
/// match, [`ApiError::Validation`] for a short new password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "Auth",
    summary = "Change password",
    security(("bearer" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Current password does not match", body = ErrorResponse),
        (status = 422, description = "New password too short", body = ErrorResponse),
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .auth
        .change_password(&actor, &req.current_password, req.new_password)
        .await?;
    Ok(Json(MessageResponse::new("password changed")))
}

/// Auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me).patch(update_me))
        .route("/auth/change-password", post(change_password))
}
