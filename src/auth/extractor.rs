//! Axum extractors for bearer-token authentication.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::TokenKind;
use crate::app_state::AppState;
use crate::domain::Actor;
use crate::error::ApiError;

/// Requires a valid access token; rejects with 401 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

/// Attaches the caller's identity when a valid access token is present.
///
/// A missing or invalid token yields `None` instead of a rejection.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Actor>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        let claims = state.token_issuer.verify(token, TokenKind::Access)?;
        Ok(Self(claims.actor()))
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let actor = bearer_token(parts)
            .and_then(|token| state.token_issuer.verify(token, TokenKind::Access).ok())
            .map(|claims| claims.actor());
        Ok(Self(actor))
    }
}
