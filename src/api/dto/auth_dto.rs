//! Account, session and user-management DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::TokenPair;
use crate::domain::{Role, User, UserId};
use crate::service::Registration;

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Login email; stored lower-cased.
    pub email: String,
    /// Plaintext password (min 8 chars).
    pub password: String,
    /// Display name.
    pub name: String,
    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Requested role; defaults to PARTICIPANT. SUPER_ADMIN is refused.
    #[serde(default)]
    pub role: Option<Role>,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
            name: req.name,
            phone: req.phone,
            role: req.role,
        }
    }
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// A refresh token from a previous login.
    pub refresh_token: String,
}

/// Request body for `POST /auth/change-password`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Current password.
    pub current_password: String,
    /// Replacement password (min 8 chars).
    pub new_password: String,
}

/// Request body for `PATCH /auth/me`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Request body for `PATCH /users/{id}/role`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    /// Role to assign.
    pub role: Role,
}

/// Public view of a user. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    /// User identifier.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: Option<String>,
    /// Assigned role.
    pub role: Role,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Last profile change.
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Response body for register and login.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// The authenticated user.
    pub user: UserDto,
    /// Access and refresh tokens.
    pub tokens: TokenPair,
}

impl AuthResponse {
    /// Pairs a user with freshly issued tokens.
    #[must_use]
    pub fn new(user: User, tokens: TokenPair) -> Self {
        Self {
            user: user.into(),
            tokens,
        }
    }
}
