//! # LogWriter — lifecycle events as structured log records.
//!
//! The engine's default subscriber. Renders every lifecycle event as a
//! [`tracing`] record tagged `component = "sminit"`, mirroring the log
//! the daemon's operators tail. Child process output does not pass
//! through here; the supervisor logs those lines directly under the
//! service's own component tag.
//!
//! ## Example output
//! ```text
//! INFO  component="sminit" service="db" service admitted
//! INFO  component="sminit" service="db" attempt=1 process started
//! INFO  component="sminit" service="db" service is running
//! ERROR component="sminit" service="api" err="exit status 1" service failed
//! DEBUG component="sminit" service="api" delay=523ms retry scheduled
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Component tag carried by every engine log record.
const COMPONENT: &str = "sminit";

/// Structured-log subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Constructs a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, event: &Event) {
        let service = event.service.as_deref().unwrap_or("-");
        match event.kind {
            EventKind::ServiceAdmitted => {
                info!(component = COMPONENT, service, "service admitted");
            }
            EventKind::ServiceRemoved => {
                info!(component = COMPONENT, service, "service deleted");
            }
            EventKind::ServicePending => {
                debug!(component = COMPONENT, service, "service pending");
            }
            EventKind::ServiceStarted => {
                info!(
                    component = COMPONENT,
                    service,
                    attempt = event.attempt,
                    "process started"
                );
            }
            EventKind::ServiceReady => {
                info!(component = COMPONENT, service, "service is running");
            }
            EventKind::ServiceSucceeded => {
                info!(component = COMPONENT, service, "service finished successfully");
            }
            EventKind::ServiceFailed => {
                error!(
                    component = COMPONENT,
                    service,
                    err = event.error.as_deref().unwrap_or("-"),
                    code = event.code,
                    "service failed"
                );
            }
            EventKind::ServiceStopped => {
                info!(component = COMPONENT, service, "service stopped");
            }
            EventKind::ProbeFailed => {
                warn!(component = COMPONENT, service, "health probe gave up");
            }
            EventKind::BackoffScheduled => {
                debug!(
                    component = COMPONENT,
                    service,
                    delay = ?event.delay,
                    attempt = event.attempt,
                    "retry scheduled"
                );
            }
            EventKind::SubscriberPanicked => {
                error!(
                    component = COMPONENT,
                    subscriber = service,
                    err = event.error.as_deref().unwrap_or("-"),
                    "subscriber panicked"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
