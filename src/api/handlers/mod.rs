//! REST endpoint handlers organized by resource.

pub mod auth;
pub mod event;
pub mod location;
pub mod participant;
pub mod report;
pub mod system;
pub mod user;
pub mod zone;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(user::routes())
        .merge(event::routes())
        .merge(participant::routes())
        .merge(zone::routes())
        .merge(location::routes())
        .merge(report::routes())
}
