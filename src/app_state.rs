//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::domain::{EventBus, LocationNotifier};
use crate::persistence::Repositories;
use crate::service::{
    AuthService, EventService, LocationService, ParticipantService, ReportService, ZoneService,
};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Accounts and sessions.
    pub auth: Arc<AuthService>,
    /// Event lifecycle.
    pub events: Arc<EventService>,
    /// Event membership.
    pub participants: Arc<ParticipantService>,
    /// Zones and risk levels.
    pub zones: Arc<ZoneService>,
    /// Location pipeline.
    pub locations: Arc<LocationService>,
    /// Incident reports.
    pub reports: Arc<ReportService>,
    /// Live update bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Verifies bearer tokens in the auth extractors.
    pub token_issuer: Arc<TokenIssuer>,
}

impl AppState {
    /// Wires every service over `repos`, publishing location updates on
    /// `event_bus`.
    #[must_use]
    pub fn new(repos: &Repositories, event_bus: EventBus, token_issuer: Arc<TokenIssuer>) -> Self {
        let notifier: Arc<dyn LocationNotifier> = Arc::new(event_bus.clone());
        Self {
            auth: Arc::new(AuthService::new(
                Arc::clone(&repos.users),
                Arc::clone(&token_issuer),
            )),
            events: Arc::new(EventService::new(Arc::clone(&repos.events))),
            participants: Arc::new(ParticipantService::new(
                Arc::clone(&repos.events),
                Arc::clone(&repos.participants),
            )),
            zones: Arc::new(ZoneService::new(
                Arc::clone(&repos.events),
                Arc::clone(&repos.zones),
            )),
            locations: Arc::new(LocationService::new(
                Arc::clone(&repos.participants),
                Arc::clone(&repos.zones),
                Arc::clone(&repos.locations),
                notifier,
            )),
            reports: Arc::new(ReportService::new(
                Arc::clone(&repos.events),
                Arc::clone(&repos.participants),
                Arc::clone(&repos.reports),
            )),
            event_bus,
            token_issuer,
        }
    }
}
