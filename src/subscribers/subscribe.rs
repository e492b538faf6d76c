//! # Subscriber trait for engine events.
//!
//! Implement [`Subscribe`] to observe the engine's lifecycle events —
//! logging, metrics, alerting. Subscribers are handed to
//! [`Engine::new`](crate::Engine::new) and receive every event published
//! after the engine is built.
//!
//! ```rust
//! use async_trait::async_trait;
//! use sminit::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ServiceFailed {
//!             // count it
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of engine lifecycle events.
///
/// Handlers run on the engine's listener task; a slow handler delays
/// later events for every subscriber, so keep them short. A panicking
/// handler is isolated and reported as a `SubscriberPanicked` event.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Called once per published event, in sequence order.
    async fn on_event(&self, event: &Event);

    /// Stable name used when reporting subscriber failures.
    fn name(&self) -> &'static str;
}
