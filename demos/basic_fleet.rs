//! # Demo: basic_fleet
//!
//! Minimal fleet: a long-running parent and a one-shot child that waits
//! for it.
//!
//! Demonstrates how to:
//! - Declare services with [`ServiceDefinition`] and dependency edges.
//! - Admit the whole fleet at startup with [`Engine::admit_fleet`].
//! - Watch the dependency gate through [`Engine::list`].
//!
//! ## Flow
//! ```text
//! admit_fleet({db, migrate})
//!   ├─► db: spawn ──► probe ──► Running
//!   │                             │
//!   └─► migrate: Pending ◄────────┘ (parent ready)
//!         └─► spawn ──► probe ──► Running ──► exit 0 ──► Successful
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_fleet
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sminit::{Config, Engine, LogWriter, ServiceDefinition};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    // 1. Default configuration and the built-in log subscriber
    let engine = Engine::new(Config::default(), vec![Arc::new(LogWriter::new())]);

    // 2. Declare the fleet: migrate waits for db to be ready
    let fleet = HashMap::from([
        (
            "db".to_string(),
            ServiceDefinition::new("db", "sleep 3600").with_log("stdout"),
        ),
        (
            "migrate".to_string(),
            ServiceDefinition::new("migrate", "echo migrations applied")
                .with_after(["db"])
                .with_one_shot(true)
                .with_log("stdout"),
        ),
    ]);

    // 3. Admit everything; parentless services start immediately
    engine.admit_fleet(fleet).await?;

    // 4. Watch the statuses settle
    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(500)).await;
        for entry in engine.list().await {
            println!("[fleet] {} = {}", entry.name, entry.status);
        }
        println!("[fleet] ---");
    }

    // 5. Tear down the parent before exiting
    engine.stop("db").await?;
    Ok(())
}
