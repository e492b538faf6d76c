//! # Fan-out of bus events to subscribers.
//!
//! One listener task per engine drains the bus and hands each event to
//! every subscriber in turn. Panics are caught per handler so one broken
//! subscriber cannot take down the listener or its peers.
//!
//! ## Rules
//! - The listener exits when the bus closes (the engine was dropped).
//! - A lagged receiver skips the missed events and keeps going.
//! - Panic reports are not re-dispatched for panic events themselves,
//!   which would otherwise loop.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::error::RecvError;

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Spawns the engine's subscriber listener task.
pub(crate) fn spawn_listener(bus: Bus, subscribers: Vec<Arc<dyn Subscribe>>) {
    if subscribers.is_empty() {
        return;
    }
    let mut rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(ev) => ev,
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(_)) => continue,
            };

            for sub in &subscribers {
                let handler = sub.on_event(&event);
                if let Err(panic) = std::panic::AssertUnwindSafe(handler).catch_unwind().await {
                    if event.kind == EventKind::SubscriberPanicked {
                        continue;
                    }
                    bus.publish(
                        Event::now(EventKind::SubscriberPanicked)
                            .with_error(panic_message(&panic))
                            .with_service(sub.name()),
                    );
                }
            }
        }
    });
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
