//! # Backoff schedule for supervised retries.
//!
//! [`BackoffPolicy`] holds the schedule parameters:
//! - [`BackoffPolicy::first`] the initial interval;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the interval cap;
//! - [`BackoffPolicy::randomization`] the jitter width around each interval.
//!
//! [`Backoff`] is one stateful instance of the schedule. The restart loop
//! and the health prober hold independent instances; the prober's carries
//! a wall-clock budget after which [`Backoff::next_delay`] returns `None`.
//! [`Backoff::reset`] rewinds an instance each time a new supervised run
//! begins.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use sminit::BackoffPolicy;
//!
//! let policy = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(1),
//!     factor: 2.0,
//!     randomization: 0.0,
//! };
//!
//! let mut backoff = policy.instance();
//! // First delay is `first`, then intervals grow by `factor` up to `max`.
//! assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
//! assert_eq!(backoff.next_delay(), Some(Duration::from_millis(200)));
//! ```

use std::time::{Duration, Instant};

use rand::Rng;

/// Parameters of the exponential-with-jitter retry schedule.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Initial interval before the first retry.
    pub first: Duration,
    /// Cap applied to the grown interval (jitter may still exceed it).
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter width: each delay is drawn uniformly from
    /// `[interval * (1 - randomization), interval * (1 + randomization)]`.
    pub randomization: f64,
}

impl Default for BackoffPolicy {
    /// Returns the engine's schedule:
    /// `first = 500ms`, `factor = 1.5`, `randomization = 0.5`, `max = 1s`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(500),
            max: Duration::from_secs(1),
            factor: 1.5,
            randomization: 0.5,
        }
    }
}

impl BackoffPolicy {
    /// Creates an unbounded instance of this schedule (restart-loop use).
    pub fn instance(&self) -> Backoff {
        Backoff {
            policy: *self,
            prev: None,
            budget: None,
            since: Instant::now(),
        }
    }

    /// Creates an instance that stops yielding delays once `budget` of
    /// wall-clock time has elapsed since the last reset (probe use).
    pub fn instance_capped(&self, budget: Duration) -> Backoff {
        Backoff {
            policy: *self,
            prev: None,
            budget: Some(budget),
            since: Instant::now(),
        }
    }

    /// Grows the previous interval by `factor`, capped at `max`.
    fn grow(&self, prev: Option<Duration>) -> Duration {
        let next = match prev {
            None => self.first,
            Some(d) => {
                let mul = d.as_secs_f64() * self.factor;
                if mul.is_finite() {
                    d.mul_f64(self.factor)
                } else {
                    self.max
                }
            }
        };
        next.min(self.max)
    }

    /// Draws a jittered delay around `interval`.
    fn jitter(&self, interval: Duration) -> Duration {
        if self.randomization <= 0.0 || interval.is_zero() {
            return interval;
        }
        let spread = self.randomization.min(1.0);
        let lo = interval.mul_f64(1.0 - spread);
        let hi = interval.mul_f64(1.0 + spread);
        let (lo_ms, hi_ms) = (lo.as_millis() as u64, hi.as_millis() as u64);
        if lo_ms >= hi_ms {
            return interval;
        }
        Duration::from_millis(rand::rng().random_range(lo_ms..=hi_ms))
    }
}

/// One stateful run of a [`BackoffPolicy`] schedule.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    /// Last unjittered interval handed out; `None` before the first delay.
    prev: Option<Duration>,
    /// Wall-clock budget; `None` means unbounded.
    budget: Option<Duration>,
    /// When the current run began (set by [`Backoff::reset`]).
    since: Instant,
}

impl Backoff {
    /// Rewinds the schedule to its first interval and restarts the
    /// wall-clock budget.
    pub fn reset(&mut self) {
        self.prev = None;
        self.since = Instant::now();
    }

    /// Returns the next delay to sleep before retrying, or `None` once the
    /// wall-clock budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(budget) = self.budget {
            if self.since.elapsed() >= budget {
                return None;
            }
        }
        let interval = self.policy.grow(self.prev);
        self.prev = Some(interval);
        Some(self.policy.jitter(interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(first_ms: u64, max_ms: u64, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            randomization: 0.0,
        }
    }

    #[test]
    fn intervals_grow_and_cap() {
        let mut b = plain(100, 350, 2.0).instance();
        assert_eq!(b.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(b.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(b.next_delay(), Some(Duration::from_millis(350)));
        assert_eq!(b.next_delay(), Some(Duration::from_millis(350)));
    }

    #[test]
    fn reset_rewinds_to_first() {
        let mut b = plain(100, 1_000, 2.0).instance();
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn jitter_stays_within_spread() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(500),
            max: Duration::from_secs(1),
            factor: 1.0,
            randomization: 0.5,
        };
        let mut b = policy.instance();
        for _ in 0..200 {
            let d = b.next_delay().unwrap();
            assert!(d >= Duration::from_millis(250), "delay {d:?} below spread");
            assert!(d <= Duration::from_millis(750), "delay {d:?} above spread");
        }
    }

    #[test]
    fn budget_exhausts() {
        let mut b = plain(1, 1, 1.0).instance_capped(Duration::ZERO);
        assert_eq!(b.next_delay(), None);

        let mut b = plain(1, 1, 1.0).instance_capped(Duration::from_secs(60));
        assert!(b.next_delay().is_some());
    }
}
