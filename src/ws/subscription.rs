//! Event scoping for one WebSocket connection.
//!
//! Every connection sees the whole location bus; this set decides which
//! updates are forwarded. A client either names the events it monitors or
//! follows all of them with `"*"`, typically a control-room screen.

use std::collections::HashSet;

use crate::domain::{EventId, LocationUpdate};

/// Events a connection monitors.
#[derive(Debug, Default)]
pub struct EventSubscriptions {
    followed: HashSet<EventId>,
    /// Set by `"*"`. Named events are kept while it is set so that
    /// dropping `"*"` falls back to them.
    all_events: bool,
}

impl EventSubscriptions {
    /// No events followed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts following `events`, and every event when `all` is set.
    pub fn follow(&mut self, events: &[EventId], all: bool) {
        self.all_events |= all;
        self.followed.extend(events.iter().copied());
    }

    /// Stops following `events`. `all` drops the `"*"` subscription but
    /// keeps events named individually.
    pub fn unfollow(&mut self, events: &[EventId], all: bool) {
        if all {
            self.all_events = false;
        }
        self.followed.retain(|id| !events.contains(id));
    }

    /// Whether `update` should be pushed to this connection.
    #[must_use]
    pub fn wants(&self, update: &LocationUpdate) -> bool {
        self.follows(update.event_id)
    }

    /// Whether updates of `event_id` are forwarded.
    #[must_use]
    pub fn follows(&self, event_id: EventId) -> bool {
        self.all_events || self.followed.contains(&event_id)
    }

    /// Events named individually.
    #[must_use]
    pub fn followed_count(&self) -> usize {
        self.followed.len()
    }

    /// Whether `"*"` is active.
    #[must_use]
    pub fn follows_all(&self) -> bool {
        self.all_events
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::ParticipantId;

    fn update_for(event_id: EventId) -> LocationUpdate {
        let participant_id = ParticipantId::new();
        LocationUpdate {
            event_id,
            participant_id,
            participant_or_user_id: *participant_id.as_uuid(),
            latitude: 10.0,
            longitude: 20.0,
            resolved_zone: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn fresh_connection_receives_nothing() {
        let subs = EventSubscriptions::new();
        assert!(!subs.wants(&update_for(EventId::new())));
    }

    #[test]
    fn only_followed_events_are_forwarded() {
        let mut subs = EventSubscriptions::new();
        let festival = EventId::new();
        subs.follow(&[festival], false);
        assert!(subs.wants(&update_for(festival)));
        assert!(!subs.wants(&update_for(EventId::new())));
    }

    #[test]
    fn dropping_wildcard_keeps_named_events() {
        let mut subs = EventSubscriptions::new();
        let festival = EventId::new();
        subs.follow(&[festival], true);
        assert!(subs.wants(&update_for(EventId::new())));

        subs.unfollow(&[], true);
        assert!(!subs.follows_all());
        assert!(!subs.wants(&update_for(EventId::new())));
        assert!(subs.wants(&update_for(festival)));
    }

    #[test]
    fn unfollow_leaves_other_events() {
        let mut subs = EventSubscriptions::new();
        let (main_stage, side_stage) = (EventId::new(), EventId::new());
        subs.follow(&[main_stage, side_stage], false);
        assert_eq!(subs.followed_count(), 2);
        subs.unfollow(&[main_stage], false);
        assert!(!subs.follows(main_stage));
        assert!(subs.follows(side_stage));
        assert_eq!(subs.followed_count(), 1);
    }
}
