//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The endpoint at `/ws` lets clients subscribe to events and receive a
//! `locationUpdate` for every ping stored through the single-location path.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
