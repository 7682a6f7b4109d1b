//! Broadcast channel for live location updates.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The location
//! pipeline publishes every stored single-path ping through it, and each
//! WebSocket connection holds a receiver it filters by event id.

use tokio::sync::broadcast;

use super::{LocationNotifier, LocationUpdate};

/// Broadcast bus for [`LocationUpdate`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest updates are
/// dropped for lagging receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LocationUpdate>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an update to all subscribers.
    ///
    /// Returns the number of receivers that received the update.
    /// If there are no active receivers, the update is silently dropped.
    pub fn publish(&self, update: LocationUpdate) -> usize {
        self.sender.send(update).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future updates.
    ///
    /// Each WebSocket connection should call this once on connect.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LocationUpdate> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl LocationNotifier for EventBus {
    fn notify(&self, update: LocationUpdate) {
        let event_id = update.event_id;
        let delivered = self.publish(update);
        tracing::debug!(%event_id, delivered, "location update broadcast");
    }
}
