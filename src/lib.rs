//! # sminit
//!
//! **sminit** is a minimal service supervisor engine: it launches a
//! declared set of user processes, enforces dependency ordering between
//! them, gates readiness on health probes, restarts failures with
//! bounded backoff, and serves a small control API for manipulating
//! services at runtime.
//!
//! The crate is the lifecycle engine only. The CLI front-end, the
//! on-disk definition loader, daemonisation and PID-file handling, and
//! the IPC/HTTP transport are external collaborators that feed
//! [`ServiceDefinition`]s in and map [`Engine`] calls onto their wire
//! format.
//!
//! ## Features
//!
//! | Area            | Description                                                    | Key types / traits                    |
//! |-----------------|----------------------------------------------------------------|---------------------------------------|
//! | **Engine**      | Registry of services and the operator request dispatcher.      | [`Engine`], [`ServiceSnapshot`]       |
//! | **Definitions** | Declare services, dependencies, health checks, log routing.    | [`ServiceDefinition`], [`Status`]     |
//! | **Policies**    | Exponential-with-jitter retry schedule for restarts and probes.| [`BackoffPolicy`]                     |
//! | **Events**      | Observe admissions, status transitions, retries.               | [`Subscribe`], [`Event`], [`EventKind`] |
//! | **Logging**     | Built-in subscriber rendering events as `tracing` records.     | [`LogWriter`]                         |
//! | **Errors**      | Typed failures at the control boundary.                        | [`EngineError`], [`ErrorKind`]        |
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use sminit::{Config, Engine, LogWriter, ServiceDefinition};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new(Config::default(), vec![Arc::new(LogWriter::new())]);
//!
//!     let fleet = HashMap::from([
//!         ("db".to_string(), ServiceDefinition::new("db", "postgres -D /var/db")
//!             .with_health_check("pg_isready")
//!             .with_log("stdout")),
//!         ("api".to_string(), ServiceDefinition::new("api", "api-server")
//!             .with_after(["db"])),
//!     ]);
//!     engine.admit_fleet(fleet).await?;
//!
//!     for entry in engine.list().await {
//!         println!("{} {}", entry.name, entry.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
mod core;
mod error;
mod events;
mod policies;
mod services;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Engine, ServiceSnapshot};
pub use error::{EngineError, ErrorKind};
pub use events::{Bus, Event, EventKind};
pub use policies::{Backoff, BackoffPolicy};
pub use services::{ServiceDefinition, Status};
pub use subscribers::{LogWriter, Subscribe};
