//! OpenAPI document for the REST surface.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers;
use crate::domain::{
    EventStatus, GeoPoint, LocationUpdate, ReportPriority, ReportStatus, ResolvedZone, RiskLevel,
    Role,
};
use crate::error::{ErrorResponse, FieldError};

/// Generated OpenAPI description, served by Swagger UI when the
/// `swagger-ui` feature is enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "EventSafe Gateway",
        description = "Event safety coordination: lifecycle, participants, zones, live locations and incident reports."
    ),
    paths(
        handlers::system::health_handler,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::me,
        handlers::auth::update_me,
        handlers::auth::change_password,
        handlers::user::list_users,
        handlers::user::get_user,
        handlers::user::update_user_role,
        handlers::user::delete_user,
        handlers::event::create_event,
        handlers::event::list_events,
        handlers::event::upcoming_events,
        handlers::event::ongoing_events,
        handlers::event::my_events,
        handlers::event::event_by_code,
        handlers::event::get_event,
        handlers::event::update_event,
        handlers::event::delete_event,
        handlers::event::publish_event,
        handlers::event::start_event,
        handlers::event::complete_event,
        handlers::participant::join_event,
        handlers::participant::join_by_code,
        handlers::participant::get_participant,
        handlers::participant::leave_event,
        handlers::participant::heartbeat,
        handlers::participant::list_participants,
        handlers::participant::active_count,
        handlers::zone::create_zone,
        handlers::zone::get_zone,
        handlers::zone::update_zone,
        handlers::zone::delete_zone,
        handlers::zone::update_risk_level,
        handlers::zone::list_zones,
        handlers::zone::critical_zones,
        handlers::location::update_location,
        handlers::location::batch_update,
        handlers::location::cleanup,
        handlers::location::latest_by_event,
        handlers::location::history,
        handlers::location::zone_density,
        handlers::report::create_report,
        handlers::report::get_report,
        handlers::report::update_status,
        handlers::report::update_priority,
        handlers::report::delete_report,
        handlers::report::list_reports,
        handlers::report::emergency_reports,
    ),
    components(schemas(
        ErrorResponse,
        FieldError,
        Role,
        EventStatus,
        RiskLevel,
        ReportStatus,
        ReportPriority,
        GeoPoint,
        LocationUpdate,
        ResolvedZone,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "System", description = "Health"),
        (name = "Auth", description = "Registration, login and tokens"),
        (name = "Users", description = "Account administration"),
        (name = "Events", description = "Event lifecycle"),
        (name = "Participants", description = "Joining and presence"),
        (name = "Zones", description = "Zones and risk levels"),
        (name = "Locations", description = "Location ingestion and queries"),
        (name = "Reports", description = "Incident reports"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected paths.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
