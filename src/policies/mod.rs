//! Retry policies shared by the restart loop and the health prober.

mod backoff;

pub use backoff::{Backoff, BackoffPolicy};
