//! File-based loader tests

use tessera_config::{ConfigLoader, ErrorStrategy, PageLayout};

#[tokio::test]
async fn test_load_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tessera.toml");
    std::fs::write(
        &path,
        r#"
[logging]
level = "debug"

[logging.targets]
tessera_events = "trace"

[canvas]
failsafe = true

[page]
title = "Dashboard"
layout = "wide"

[broker]
name = "app"

[[broker.topics]]
id = "filters"
error_strategy = "custom"
max_dead_letters = 10

[[broker.topics]]
id = "orders"
version = "2.0.0"
blacklist = ["bob"]
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).await.unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.logging.targets.get("tessera_events").map(String::as_str),
        Some("trace")
    );
    assert!(config.canvas.failsafe);
    assert!(config.canvas.strict);
    assert_eq!(config.page.title, "Dashboard");
    assert_eq!(config.page.layout, PageLayout::Wide);
    assert_eq!(config.broker.topics.len(), 2);
    assert_eq!(config.broker.topics[0].error_strategy, ErrorStrategy::Custom);
    assert_eq!(config.broker.topics[0].max_dead_letters, 10);
    assert_eq!(config.broker.topics[1].full_id(), "orders@2.0.0");
}

#[tokio::test]
async fn test_load_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tessera.json");
    std::fs::write(&path, r#"{"broker": {"topics": [{"id": "events"}]}}"#).unwrap();

    let config = ConfigLoader::load_from_file(&path).await.unwrap();
    assert_eq!(config.broker.name, "broker");
    assert_eq!(config.broker.topics[0].id, "events");
}

#[tokio::test]
async fn test_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = ConfigLoader::load_from_file(&path).await.unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}
