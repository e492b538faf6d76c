//! Control-API properties: request validation, idempotence, and the
//! snapshot wire shape.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sminit::{Config, Engine, EngineError, ErrorKind, ServiceDefinition, ServiceSnapshot, Status};

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
async fn duplicate_names_are_rejected() {
    let engine = engine();
    engine
        .add(ServiceDefinition::new("s", "sleep 60"))
        .await
        .unwrap();

    let err = engine
        .add(ServiceDefinition::new("s", "sleep 60"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyTracked { .. }));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn parents_must_be_admitted_first() {
    let engine = engine();
    let err = engine
        .add(ServiceDefinition::new("child", "sleep 60").with_after(["missing"]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingParent { .. }));
    assert!(engine.list().await.is_empty());
}

#[tokio::test]
async fn unknown_names_are_rejected_everywhere() {
    let engine = engine();
    assert!(matches!(
        engine.delete("ghost").await.unwrap_err(),
        EngineError::NotTracked { .. }
    ));
    assert!(matches!(
        engine.stop("ghost").await.unwrap_err(),
        EngineError::NotTracked { .. }
    ));
    assert!(matches!(
        engine.start("ghost").await.unwrap_err(),
        EngineError::NotTracked { .. }
    ));
}

#[tokio::test]
async fn add_then_delete_restores_the_registry() {
    let engine = engine();
    assert!(engine.list().await.is_empty());

    engine
        .add(ServiceDefinition::new("s", "sleep 60"))
        .await
        .unwrap();
    assert_eq!(engine.list().await.len(), 1);

    engine.delete("s").await.unwrap();
    assert!(engine.list().await.is_empty());
}

#[tokio::test]
async fn repeated_stop_is_a_successful_noop() {
    let engine = engine();
    engine
        .add(ServiceDefinition::new("s", "sleep 60"))
        .await
        .unwrap();
    assert!(wait_for_status(&engine, "s", Status::Running, Duration::from_secs(10)).await);

    engine.stop("s").await.unwrap();
    assert_eq!(status_of(&engine, "s").await, Some(Status::Stopped));

    engine.stop("s").await.unwrap();
    engine.stop("s").await.unwrap();
    assert_eq!(status_of(&engine, "s").await, Some(Status::Stopped));
}

#[tokio::test]
async fn start_rejects_exactly_the_started_set() {
    let engine = engine();
    engine
        .add(ServiceDefinition::new("s", "sleep 3600"))
        .await
        .unwrap();
    assert!(wait_for_status(&engine, "s", Status::Running, Duration::from_secs(10)).await);

    // running counts as started
    let err = engine.start("s").await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyStarted { .. }));
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    // stopped does not
    engine.stop("s").await.unwrap();
    engine.start("s").await.unwrap();
    assert!(wait_for_status(&engine, "s", Status::Running, Duration::from_secs(10)).await);
}

#[tokio::test]
async fn list_is_pure() {
    let engine = engine();
    engine
        .add(ServiceDefinition::new("a", "sleep 60"))
        .await
        .unwrap();
    engine
        .add(ServiceDefinition::new("b", "sleep 60"))
        .await
        .unwrap();
    engine.stop("a").await.unwrap();
    engine.stop("b").await.unwrap();

    let mut first = engine.list().await;
    let mut second = engine.list().await;
    first.sort_by(|x, y| x.name.cmp(&y.name));
    second.sort_by(|x, y| x.name.cmp(&y.name));
    assert_eq!(first, second);
}

#[tokio::test]
async fn snapshots_serialize_for_the_transport() {
    let snapshot = ServiceSnapshot {
        name: "db".to_string(),
        status: Status::Running,
    };
    assert_eq!(
        serde_json::to_value(&snapshot).unwrap(),
        serde_json::json!({"name": "db", "status": "running"})
    );

    let parsed: ServiceSnapshot =
        serde_json::from_str(r#"{"name": "db", "status": "stopped"}"#).unwrap();
    assert_eq!(parsed.status, Status::Stopped);
}

#[tokio::test]
async fn fleet_admission_is_all_or_nothing() {
    let engine = engine();

    // unresolved parent fails the whole startup
    let fleet = HashMap::from([
        ("a".to_string(), ServiceDefinition::new("a", "sleep 60")),
        (
            "b".to_string(),
            ServiceDefinition::new("b", "sleep 60").with_after(["ghost"]),
        ),
    ]);
    let err = engine.admit_fleet(fleet).await.unwrap_err();
    assert!(matches!(err, EngineError::MissingParent { .. }));
    assert!(engine.list().await.is_empty());

    // cycles fail the whole startup
    let fleet = HashMap::from([
        (
            "a".to_string(),
            ServiceDefinition::new("a", "sleep 60").with_after(["b"]),
        ),
        (
            "b".to_string(),
            ServiceDefinition::new("b", "sleep 60").with_after(["a"]),
        ),
    ]);
    let err = engine.admit_fleet(fleet).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert!(engine.list().await.is_empty());
}

#[tokio::test]
async fn blank_definitions_are_rejected() {
    let engine = engine();

    let err = engine
        .add(ServiceDefinition::new("", "sleep 60"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDefinition { .. }));

    let err = engine
        .add(ServiceDefinition::new("s", "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDefinition { .. }));
}

#[tokio::test]
async fn definitions_deserialize_from_loader_maps() {
    // the on-disk loader hands the engine a name-keyed map; names come
    // from the keys
    let raw = r#"{"db": {"cmd": "sleep 60"}, "api": {"cmd": "sleep 60", "after": ["db"]}}"#;
    let defs: HashMap<String, ServiceDefinition> = serde_json::from_str(raw).unwrap();

    let engine = engine();
    engine.admit_fleet(defs).await.unwrap();
    assert_eq!(engine.list().await.len(), 2);
}
