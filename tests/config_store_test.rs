//! ConfigStore behavior against a real backing file.

use conductor::config::{HealthProbe, ServiceTimeouts};
use conductor::ConfigStore;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

fn store_with(yaml: &str) -> (Arc<ConfigStore>, NamedTempFile) {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(yaml.as_bytes()).expect("write config");
    file.flush().expect("flush config");
    let store = Arc::new(ConfigStore::load(file.path()).expect("load config"));
    (store, file)
}

#[test]
fn test_full_document_round_trip() {
    let (store, _file) = store_with(
        r#"
services:
  core:
    - name: database
      startup_priority: 1
      startup_timeout: 30s
      shutdown_timeout: 10s
      healthcheck:
        enabled: true
        interval: 15s
        timeout: 2s
        command: pg_isready
  base:
    - name: cache
      startup_priority: 2
  data:
    - name: exporter
      startup_priority: 10
      enabled: false
  app:
    - name: api
      startup_priority: 20
      dependencies:
        - database
        - service: cache
          required: false
      healthcheck:
        httpGet: http://localhost:8080/health
"#,
    );

    assert_eq!(
        store.startup_order(),
        ["database", "cache", "exporter", "api"]
    );
    assert!(store.is_enabled("database"));
    assert!(!store.is_enabled("exporter"));

    assert_eq!(
        store.timeouts("database"),
        ServiceTimeouts {
            startup: Duration::from_secs(30),
            shutdown: Duration::from_secs(10),
        }
    );
    // Unconfigured timeouts fall back to defaults.
    assert_eq!(store.timeouts("cache"), ServiceTimeouts::default());

    let db_check = store.health_check("database").expect("descriptor present");
    assert_eq!(db_check.interval, Duration::from_secs(15));
    assert!(matches!(db_check.probe, HealthProbe::Command { ref command } if command == "pg_isready"));

    let api_check = store.health_check("api").expect("descriptor present");
    assert!(matches!(api_check.probe, HealthProbe::HttpGet { .. }));
    assert!(store.health_check("cache").is_none());

    let api = store.get("api").unwrap();
    assert_eq!(api.category, "app");
    assert_eq!(api.dependencies.len(), 2);
}

#[test]
fn test_notify_subscribers_only_after_good_reload() {
    let (store, file) = store_with(
        r#"
services:
  core:
    - name: database
"#,
    );
    let mut rx = store.subscribe();

    // Broken edit: snapshot retained, no notification.
    std::fs::write(file.path(), "services: {broken").unwrap();
    store.reload_and_notify();
    assert!(rx.try_recv().is_err());
    assert!(store.is_enabled("database"));

    // Good edit: snapshot swapped, subscribers told.
    std::fs::write(
        file.path(),
        r#"
services:
  core:
    - name: database
      enabled: false
    - name: cache
"#,
    )
    .unwrap();
    store.reload_and_notify();
    assert!(rx.try_recv().is_ok());
    assert!(!store.is_enabled("database"));
    assert!(store.is_enabled("cache"));
}

#[test]
fn test_snapshot_is_stable_across_reload() {
    let (store, file) = store_with(
        r#"
services:
  core:
    - name: database
      startup_priority: 1
"#,
    );
    let before = store.snapshot();

    std::fs::write(file.path(), "services: {}").unwrap();
    store.reload().unwrap();

    // Holders of the old snapshot keep a consistent view.
    assert!(before.contains("database"));
    assert!(!store.snapshot().contains("database"));
}
