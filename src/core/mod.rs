//! The lifecycle engine: registry, dispatcher, per-service supervisors,
//! and the health prober.

mod actor;
mod engine;
mod probe;
mod runner;

pub use engine::{Engine, ServiceSnapshot};
