//! End-to-end lifecycle scenarios driving real child processes.
//!
//! These tests exercise the engine the way the daemon does: admit
//! services backed by `sleep`/`true`/`false`/`echo`, then observe
//! status transitions through `list` and the event stream.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sminit::{Config, Engine, EventKind, LogWriter, ServiceDefinition, Status};

fn engine() -> Arc<Engine> {
    Engine::new(Config::default(), Vec::new())
}

async fn status_of(engine: &Engine, name: &str) -> Option<Status> {
    engine
        .list()
        .await
        .into_iter()
        .find(|s| s.name == name)
        .map(|s| s.status)
}

async fn wait_for_status(engine: &Engine, name: &str, want: Status, deadline: Duration) -> bool {
    let started = Instant::now();
    while started.elapsed() < deadline {
        if status_of(engine, name).await == Some(want) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn linear_dependency_starts_child_after_parent_is_ready() {
    let engine = engine();
    let fleet = HashMap::from([
        (
            "a".to_string(),
            ServiceDefinition::new("a", "sleep 60"),
        ),
        (
            "b".to_string(),
            ServiceDefinition::new("b", "echo ok")
                .with_after(["a"])
                .with_one_shot(true),
        ),
    ]);
    engine.admit_fleet(fleet).await.unwrap();

    assert!(wait_for_status(&engine, "a", Status::Running, Duration::from_secs(10)).await);
    assert!(wait_for_status(&engine, "b", Status::Successful, Duration::from_secs(10)).await);

    let snapshot = engine.list().await;
    assert_eq!(snapshot.len(), 2);
    assert_eq!(status_of(&engine, "a").await, Some(Status::Running));
    assert_eq!(status_of(&engine, "b").await, Some(Status::Successful));
}

#[tokio::test]
async fn deleting_a_parent_leaves_the_child_running_and_blocks_new_dependents() {
    let engine = engine();
    let fleet = HashMap::from([
        ("a".to_string(), ServiceDefinition::new("a", "sleep 60")),
        (
            "b".to_string(),
            ServiceDefinition::new("b", "sleep 60").with_after(["a"]),
        ),
    ]);
    engine.admit_fleet(fleet).await.unwrap();
    assert!(wait_for_status(&engine, "b", Status::Running, Duration::from_secs(15)).await);

    engine.delete("a").await.unwrap();

    let snapshot = engine.list().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].name, "b");
    assert_eq!(snapshot[0].status, Status::Running);

    // a new dependent of the deleted service cannot be admitted
    let err = engine
        .add(ServiceDefinition::new("c", "sleep 60").with_after(["a"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), sminit::ErrorKind::BadRequest);
}

#[tokio::test]
async fn failing_service_cycles_through_restarts() {
    let engine = engine();
    let mut events = engine.subscribe();

    engine
        .add(ServiceDefinition::new("s", "false"))
        .await
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut failures = 0;
    while failures < 3 && Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(ev)) if ev.kind == EventKind::ServiceFailed => failures += 1,
            Ok(Ok(_)) => {}
            _ => break,
        }
    }
    assert!(failures >= 3, "saw only {failures} failures within 10s");

    // the service never satisfies a readiness gate
    assert_ne!(status_of(&engine, "s").await, Some(Status::Running));
}

#[tokio::test]
async fn one_shot_success_is_terminal() {
    let engine = engine();
    engine
        .add(ServiceDefinition::new("s", "true").with_one_shot(true))
        .await
        .unwrap();

    assert!(wait_for_status(&engine, "s", Status::Successful, Duration::from_secs(10)).await);

    // stays terminal
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(status_of(&engine, "s").await, Some(Status::Successful));

    let err = engine.start("s").await.unwrap_err();
    assert_eq!(err.kind(), sminit::ErrorKind::BadRequest);
}

#[tokio::test]
async fn stopped_service_can_be_started_again() {
    let engine = engine();
    engine
        .add(ServiceDefinition::new("s", "sleep 3600"))
        .await
        .unwrap();
    assert!(wait_for_status(&engine, "s", Status::Running, Duration::from_secs(10)).await);

    engine.stop("s").await.unwrap();
    // stop acknowledges only after the transition, so it is visible now
    assert_eq!(status_of(&engine, "s").await, Some(Status::Stopped));

    engine.start("s").await.unwrap();
    assert!(wait_for_status(&engine, "s", Status::Running, Duration::from_secs(10)).await);
}

#[tokio::test]
async fn failing_probe_gates_readiness_and_kills_the_child() {
    let cfg = Config {
        probe_cap: Duration::from_secs(2),
        ..Config::default()
    };
    let engine = Engine::new(cfg, Vec::new());
    let mut events = engine.subscribe();

    engine
        .add(ServiceDefinition::new("s", "sleep 3600").with_health_check("false"))
        .await
        .unwrap();

    // the probe cap elapses and the attempt fails; readiness never fires
    let deadline = Instant::now() + Duration::from_secs(15);
    let mut failed = false;
    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, events.recv()).await {
            Ok(Ok(ev)) => match ev.kind {
                EventKind::ServiceReady => panic!("service became ready with a failing probe"),
                EventKind::ServiceFailed => {
                    failed = true;
                    break;
                }
                _ => {}
            },
            _ => break,
        }
    }
    assert!(failed, "probe exhaustion never failed the service");
    assert_ne!(status_of(&engine, "s").await, Some(Status::Running));
}

#[tokio::test]
async fn log_writer_and_stdout_routing_survive_a_full_run() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let engine = Engine::new(Config::default(), vec![Arc::new(LogWriter::new())]);
    engine
        .add(
            ServiceDefinition::new("s", "echo hello from the child")
                .with_one_shot(true)
                .with_log("stdout"),
        )
        .await
        .unwrap();

    assert!(wait_for_status(&engine, "s", Status::Successful, Duration::from_secs(10)).await);
}

#[tokio::test]
async fn delete_while_running_stops_the_child() {
    let engine = engine();
    engine
        .add(ServiceDefinition::new("s", "sleep 3600"))
        .await
        .unwrap();
    assert!(wait_for_status(&engine, "s", Status::Running, Duration::from_secs(10)).await);

    engine.delete("s").await.unwrap();
    assert!(engine.list().await.is_empty());

    // the name is free for re-admission
    engine
        .add(ServiceDefinition::new("s", "sleep 3600"))
        .await
        .unwrap();
    assert!(wait_for_status(&engine, "s", Status::Running, Duration::from_secs(10)).await);
}

#[tokio::test]
async fn restored_parent_reenables_a_waiting_child() {
    let engine = engine();
    let fleet = HashMap::from([
        ("a".to_string(), ServiceDefinition::new("a", "sleep 60")),
        (
            "b".to_string(),
            ServiceDefinition::new("b", "sleep 60").with_after(["a"]),
        ),
    ]);
    engine.admit_fleet(fleet).await.unwrap();
    assert!(wait_for_status(&engine, "b", Status::Running, Duration::from_secs(15)).await);

    // drop the parent, park the child again
    engine.delete("a").await.unwrap();
    engine.stop("b").await.unwrap();
    engine.start("b").await.unwrap();

    // parent absent: b stays pending
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(status_of(&engine, "b").await, Some(Status::Pending));

    // restoring the parent lets b start transparently
    engine
        .add(ServiceDefinition::new("a", "sleep 60"))
        .await
        .unwrap();
    assert!(wait_for_status(&engine, "b", Status::Running, Duration::from_secs(15)).await);
}
