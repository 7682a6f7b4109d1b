//! # eventsafe-gateway
//!
//! REST API and WebSocket gateway for running safe events: event
//! lifecycle, participant presence, risk zones, live location fan-out and
//! incident reports.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)  ── bearer auth extractors (auth/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── Services (service/)
//!     ├── EventBus (domain/)    ── LocationNotifier port
//!     │
//!     ├── Repository traits (persistence/)
//!     │       ├── PostgreSQL (sqlx)
//!     │       └── In-memory store
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod server;
pub mod service;
pub mod ws;
