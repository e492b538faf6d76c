//! # Engine configuration.
//!
//! [`Config`] centralizes the knobs shared by every supervisor task:
//! the restart/probe backoff schedule, the probe's wall-clock cap, and
//! the event bus capacity. One `Config` is handed to
//! [`Engine::new`](crate::Engine::new) and cloned into each supervisor.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Engine-wide configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Backoff schedule shared by the restart loop and the health
    /// prober (each holds its own instance).
    pub backoff: BackoffPolicy,

    /// Wall-clock budget for one readiness probe; once it elapses the
    /// probe reports not-ready and the child is killed.
    pub probe_cap: Duration,

    /// Capacity of the event bus ring buffer. Subscribers lagging past
    /// it skip the oldest events. Clamped to at least 1.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Default configuration:
    /// - `backoff`: 500 ms initial, ×1.5 growth, 0.5 randomisation,
    ///   1 s interval cap;
    /// - `probe_cap = 60s`;
    /// - `bus_capacity = 1024`.
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            probe_cap: Duration::from_secs(60),
            bus_capacity: 1024,
        }
    }
}
