//! # Lifecycle events emitted by the engine and its supervisors.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries the service
//! name and optional metadata (error text, exit code, backoff delay,
//! attempt counter).
//!
//! ## Ordering
//! Every event gets a globally unique, monotonically increasing `seq`,
//! so observers can order events even when broadcast delivery interleaves
//! across supervisor tasks.
//!
//! ## Flow per supervised run
//! ```text
//! ServiceStarted → ServiceReady → ServiceSucceeded | ServiceFailed
//!       │                                │
//!       └── ProbeFailed ─ ServiceFailed ─┴── BackoffScheduled → ServicePending → (next attempt)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use crate::services::Status;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// A service was admitted into the registry.
    ServiceAdmitted,
    /// A service was removed from the registry after its supervisor
    /// acknowledged deletion.
    ServiceRemoved,

    // === Status transitions ===
    /// A service was scheduled back to `Pending` for its next attempt.
    ServicePending,
    /// The child process was spawned; readiness probe pending.
    ServiceStarted,
    /// The readiness probe passed; the service is `Running`.
    ServiceReady,
    /// The child exited with code 0.
    ServiceSucceeded,
    /// Spawn failed, the probe budget ran out, or the child exited
    /// non-zero.
    ServiceFailed,
    /// The service was stopped by an operator.
    ServiceStopped,

    // === Supervision detail ===
    /// The readiness probe gave up without passing.
    ProbeFailed,
    /// A retry was scheduled after a backoff delay.
    BackoffScheduled,

    // === Internals ===
    /// A subscriber panicked while handling an event.
    SubscriberPanicked,
}

/// One engine event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp; for logging only.
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Service the event concerns, if any.
    pub service: Option<String>,
    /// Status recorded alongside a transition, if relevant.
    pub status: Option<Status>,
    /// Error message, if the event represents a failure.
    pub error: Option<String>,
    /// Child exit code, if relevant.
    pub code: Option<i32>,
    /// Backoff delay before the next attempt, if relevant.
    pub delay: Option<Duration>,
    /// Attempt counter within the current supervised run.
    pub attempt: Option<u64>,
}

impl Event {
    /// Creates an event of the given kind, stamped and sequenced.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            status: None,
            error: None,
            code: None,
            delay: None,
            attempt: None,
        }
    }

    /// Attaches the service name.
    pub fn with_service(mut self, name: impl Into<String>) -> Self {
        self.service = Some(name.into());
        self
    }

    /// Attaches the status recorded by a transition.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Attaches a child exit code.
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Attaches a backoff delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Attaches an attempt counter.
    pub fn with_attempt(mut self, attempt: u64) -> Self {
        self.attempt = Some(attempt);
        self
    }
}
