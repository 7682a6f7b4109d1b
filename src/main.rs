//! eventsafe-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use eventsafe_gateway::app_state::AppState;
use eventsafe_gateway::auth::TokenIssuer;
use eventsafe_gateway::config::{GatewayConfig, LogFormat};
use eventsafe_gateway::domain::EventBus;
use eventsafe_gateway::persistence::Repositories;
use eventsafe_gateway::server::build_app;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn connect_repositories(config: &GatewayConfig) -> anyhow::Result<Repositories> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled, using in-memory store");
        return Ok(Repositories::in_memory());
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running database migrations")?;
    tracing::info!(
        max_connections = config.database_max_connections,
        "connected to PostgreSQL"
    );
    Ok(Repositories::postgres(pool))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("loading configuration")?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting eventsafe-gateway");

    let repos = connect_repositories(&config).await?;
    let event_bus = EventBus::new(config.event_bus_capacity);
    let token_issuer = Arc::new(TokenIssuer::new(
        &config.jwt_secret,
        config.access_token_ttl(),
        config.refresh_token_ttl(),
    ));
    let app_state = AppState::new(&repos, event_bus, token_issuer);

    if let Some(admin) = &config.admin {
        let user = app_state
            .auth
            .ensure_admin(&admin.email, &admin.password)
            .await
            .context("ensuring admin account")?;
        tracing::info!(user_id = %user.id, "admin account ready");
    }

    let retention = Arc::clone(&app_state.locations).spawn_retention_task(
        config.location_retention_days,
        Duration::from_secs(config.cleanup_interval_secs.max(1)),
    );
    if retention.is_some() {
        tracing::info!(
            days = config.location_retention_days,
            every_secs = config.cleanup_interval_secs,
            "location retention enabled"
        );
    }

    let app = build_app(app_state, Duration::from_secs(config.request_timeout_secs));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = retention {
        handle.abort();
    }
    Ok(())
}
