//! Gateway error types with HTTP status code mapping.
//!
//! [`ApiError`] is the central error type for services and handlers. Each
//! variant maps to a specific HTTP status code and is rendered in the
//! uniform response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    /// Offending request field, when the failure is tied to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable description of the failure.
    pub message: String,
}

impl FieldError {
    /// Creates a failure bound to a named field.
    #[must_use]
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }
}

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "success": false,
///   "error": "event not found: 5f0c…",
///   "errors": [{ "field": "email", "message": "must be a valid email" }]
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false` for errors.
    pub success: bool,
    /// Human-readable error message.
    pub error: String,
    /// Field-by-field details for validation failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// | Variant                 | HTTP Status                |
/// |-------------------------|----------------------------|
/// | Validation              | 422 Unprocessable Entity   |
/// | BadRequest              | 400 Bad Request            |
/// | Unauthorized            | 401 Unauthorized           |
/// | Forbidden               | 403 Forbidden              |
/// | NotFound                | 404 Not Found              |
/// | Conflict                | 409 Conflict               |
/// | Persistence / Internal  | 500 Internal Server Error  |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body failed field validation.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// Request is well-formed but not acceptable in the current state.
    #[error("{0}")]
    BadRequest(String),

    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated caller lacks the role or ownership required.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Unique constraint violation.
    #[error("{0}")]
    Conflict(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Builds a [`ApiError::NotFound`] for the given entity kind and id.
    #[must_use]
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} not found: {id}"))
    }

    /// Builds a [`ApiError::Validation`] with a single field failure.
    #[must_use]
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(format!("duplicate value violates {}", constraint_name(&**db)))
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::NotFound(format!("referenced record missing ({})", constraint_name(&**db)))
            }
            _ => Self::Persistence(err.to_string()),
        }
    }
}

fn constraint_name(db: &dyn sqlx::error::DatabaseError) -> String {
    db.constraint().unwrap_or("constraint").to_string()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error, errors) = match self {
            Self::Validation(errors) => ("validation failed".to_string(), errors),
            Self::Persistence(ref detail) | Self::Internal(ref detail) => {
                tracing::error!(error = %detail, "request failed");
                ("internal server error".to_string(), Vec::new())
            }
            other => (other.to_string(), Vec::new()),
        };
        let body = ErrorResponse {
            success: false,
            error,
            errors,
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::invalid_field("email", "bad").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::not_found("event", 1).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = ApiError::not_found("zone", "abc");
        assert_eq!(err.to_string(), "zone not found: abc");
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let response = ApiError::Persistence("password=hunter2".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
