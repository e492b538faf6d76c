//! # Broadcast bus for lifecycle events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so supervisor tasks and the
//! dispatcher can publish [`Event`]s to any number of subscribers.
//!
//! - Broadcast semantics: every active subscriber sees each event.
//! - Non-persistent: with no subscribers, publishing is a no-op.
//! - Bounded: a subscriber that lags past the channel capacity skips
//!   the oldest events and observes `Lagged`.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for engine events.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus whose ring buffer holds `capacity` events
    /// (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current subscribers.
    ///
    /// Dropped silently when nobody is listening; the engine operates
    /// without observers.
    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Creates a receiver that observes every event published after
    /// this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
