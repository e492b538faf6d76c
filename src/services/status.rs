//! # Service status values.
//!
//! Every admitted service is in exactly one [`Status`] at any moment.
//! Two derived predicates drive the scheduler:
//! - [`Status::is_ready`] — the service satisfies its role as a parent;
//! - [`Status::has_started`] — the service may not be started again
//!   without an intervening stop.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an admitted service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Admitted but not running; waiting for parents or an operator start.
    Pending,
    /// Child process spawned; readiness probe not yet passed.
    Started,
    /// Probe passed; the service counts as ready for its dependents.
    Running,
    /// Child exited with code 0. Terminal for one-shot services.
    Successful,
    /// Spawn failed, the probe budget ran out, or the child exited non-zero.
    Failed,
    /// Stopped by an operator; a child that was running has been killed.
    Stopped,
}

impl Status {
    /// True if the service satisfies a dependent's start gate.
    pub fn is_ready(self) -> bool {
        matches!(self, Status::Running | Status::Successful)
    }

    /// True if the service must not be started again without an
    /// intervening stop.
    pub fn has_started(self) -> bool {
        matches!(
            self,
            Status::Started | Status::Running | Status::Successful | Status::Failed
        )
    }

    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Started => "started",
            Status::Running => "running",
            Status::Successful => "successful",
            Status::Failed => "failed",
            Status::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
