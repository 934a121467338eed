//! Single source of truth for which services exist and how they start.
//!
//! The store loads the services document once at construction (a missing file
//! is fatal to process startup), then re-parses on demand. A failed reload
//! keeps the previous snapshot in effect, so the supervisor never runs with
//! zero known services because of one bad edit.

use super::parser::{DocumentParser, Snapshot};
use super::types::{HealthCheckConfig, ServiceConfig, ServiceTimeouts};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Notification sent to subscribers after a successful reload.
#[derive(Debug, Clone)]
pub struct ConfigChanged;

/// Capacity of the change-notification channel. Reconciliation is cheap and
/// idempotent, so lagging subscribers can safely miss intermediate edits.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Loads and watches the services document, answering ordering, enablement,
/// timeout and dependency queries for the orchestrator.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    snapshot: RwLock<Arc<Snapshot>>,
    change_tx: broadcast::Sender<ConfigChanged>,
}

impl ConfigStore {
    /// Load the services document at `path`.
    ///
    /// Unlike later reloads, a missing or malformed file here is an error:
    /// starting the process without any known services is not meaningful.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!(
                "Failed to read services config '{}': {}",
                path.display(),
                e
            ))
        })?;
        let snapshot = DocumentParser::new().parse(&content)?;
        tracing::info!(
            "Loaded services config '{}' ({} services)",
            path.display(),
            snapshot.len()
        );

        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            path,
            snapshot: RwLock::new(Arc::new(snapshot)),
            change_tx,
        })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-parse the backing document and swap in the new snapshot.
    ///
    /// On failure the previous snapshot stays in effect and the error is
    /// returned to the caller.
    pub fn reload(&self) -> Result<()> {
        let content = std::fs::read_to_string(&self.path)?;
        let snapshot = DocumentParser::new().parse(&content)?;
        *self.snapshot.write() = Arc::new(snapshot);
        Ok(())
    }

    /// Reload, and notify subscribers only if the reload succeeded.
    ///
    /// This is what the file-watch adapter calls on every change event. Parse
    /// errors degrade to "no change applied" plus a warning.
    pub fn reload_and_notify(&self) {
        match self.reload() {
            Ok(()) => {
                tracing::info!(
                    "Services config '{}' reloaded ({} services)",
                    self.path.display(),
                    self.snapshot().len()
                );
                // Send fails only when nobody is subscribed, which is fine.
                let _ = self.change_tx.send(ConfigChanged);
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring services config change, reload failed: {}",
                    e
                );
            }
        }
    }

    /// Subscribe to change notifications.
    ///
    /// The concrete trigger is an adapter decision: production wires a file
    /// watcher to `reload_and_notify`, tests call it directly.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChanged> {
        self.change_tx.subscribe()
    }

    /// Current snapshot. Cheap to take; holders see a consistent view even
    /// across concurrent reloads.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Full config entry for a service, if the document declares it.
    pub fn get(&self, name: &str) -> Option<ServiceConfig> {
        self.snapshot().get(name).cloned()
    }

    /// Whether the service is declared and enabled. Unknown names are simply
    /// disabled, so callers never special-case them.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.snapshot().get(name).map_or(false, |entry| entry.enabled)
    }

    /// Startup/shutdown bounds for a service; defaults for unknown names.
    pub fn timeouts(&self, name: &str) -> ServiceTimeouts {
        self.snapshot()
            .get(name)
            .map_or_else(ServiceTimeouts::default, |entry| ServiceTimeouts {
                startup: entry.startup_timeout,
                shutdown: entry.shutdown_timeout,
            })
    }

    /// Health-check descriptor for a service, if configured.
    pub fn health_check(&self, name: &str) -> Option<HealthCheckConfig> {
        self.snapshot()
            .get(name)
            .and_then(|entry| entry.healthcheck.clone())
    }

    /// All known service names in startup order (ascending priority, document
    /// order on ties). Reversed for shutdown.
    pub fn startup_order(&self) -> Vec<String> {
        self.snapshot().startup_order().to_vec()
    }

    /// Check that every dependency of `name` is satisfiable right now.
    ///
    /// A required dependency that is unknown or disabled fails the call; an
    /// optional one in the same state only logs a warning. Evaluated against
    /// the current snapshot on every call, never cached, so flipping a
    /// dependency's `enabled` flag changes the outcome of the next start.
    pub fn validate_dependencies(&self, name: &str) -> Result<()> {
        let snapshot = self.snapshot();
        let Some(entry) = snapshot.get(name) else {
            // Nothing declared means nothing to validate.
            return Ok(());
        };

        for dep in &entry.dependencies {
            let dep_name = dep.service_name();
            let satisfied = snapshot.get(dep_name).map_or(false, |d| d.enabled);
            if satisfied {
                continue;
            }
            if dep.is_required() {
                return Err(Error::Dependency {
                    service: name.to_string(),
                    dependency: dep_name.to_string(),
                });
            }
            tracing::warn!(
                "Optional dependency '{}' of service '{}' is missing or disabled",
                dep_name,
                name
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn store_with(yaml: &str) -> (ConfigStore, NamedTempFile) {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(yaml.as_bytes()).expect("write config");
        file.flush().expect("flush config");
        let store = ConfigStore::load(file.path()).expect("load config");
        (store, file)
    }

    fn rewrite(file: &NamedTempFile, yaml: &str) {
        std::fs::write(file.path(), yaml).expect("rewrite config");
    }

    const BASE: &str = r#"
services:
  core:
    - name: database
      startup_priority: 1
      startup_timeout: 10s
      shutdown_timeout: 2s
  app:
    - name: api
      startup_priority: 5
      dependencies:
        - database
    - name: metrics
      startup_priority: 5
      enabled: false
"#;

    #[test]
    fn test_load_missing_file_is_fatal() {
        let err = ConfigStore::load("/nonexistent/services.yaml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_lookups_total_over_unknown_names() {
        let (store, _file) = store_with(BASE);
        assert!(!store.is_enabled("ghost"));
        assert_eq!(store.timeouts("ghost"), ServiceTimeouts::default());
        assert!(store.health_check("ghost").is_none());
    }

    #[test]
    fn test_enabled_and_timeouts() {
        let (store, _file) = store_with(BASE);
        assert!(store.is_enabled("database"));
        assert!(!store.is_enabled("metrics"));
        let t = store.timeouts("database");
        assert_eq!(t.startup, Duration::from_secs(10));
        assert_eq!(t.shutdown, Duration::from_secs(2));
    }

    #[test]
    fn test_startup_order_includes_disabled() {
        let (store, _file) = store_with(BASE);
        assert_eq!(store.startup_order(), ["database", "api", "metrics"]);
    }

    #[test]
    fn test_validate_dependencies_required_missing() {
        let (store, _file) = store_with(
            r#"
services:
  app:
    - name: api
      dependencies:
        - database
"#,
        );
        let err = store.validate_dependencies("api").unwrap_err();
        assert!(matches!(
            err,
            Error::Dependency { ref service, ref dependency }
                if service == "api" && dependency == "database"
        ));
    }

    #[test]
    fn test_validate_dependencies_optional_missing_is_ok() {
        let (store, _file) = store_with(
            r#"
services:
  app:
    - name: api
      dependencies:
        - service: metrics
          required: false
"#,
        );
        store.validate_dependencies("api").expect("optional only warns");
    }

    #[test]
    fn test_validate_dependencies_disabled_required_blocks() {
        let (store, _file) = store_with(
            r#"
services:
  core:
    - name: database
      enabled: false
  app:
    - name: api
      dependencies:
        - database
"#,
        );
        assert!(store.validate_dependencies("api").is_err());
    }

    #[test]
    fn test_validate_dependencies_unknown_service_is_ok() {
        let (store, _file) = store_with(BASE);
        store.validate_dependencies("ghost").expect("nothing to validate");
    }

    #[test]
    fn test_reload_failure_keeps_previous_snapshot() {
        let (store, file) = store_with(BASE);
        rewrite(&file, "services: [broken");
        assert!(store.reload().is_err());
        // Old snapshot still answers queries.
        assert!(store.is_enabled("database"));
        assert_eq!(store.snapshot().len(), 3);
    }

    #[test]
    fn test_reload_and_notify_emits_only_on_success() {
        let (store, file) = store_with(BASE);
        let mut rx = store.subscribe();

        rewrite(&file, "services: [broken");
        store.reload_and_notify();
        assert!(rx.try_recv().is_err(), "failed reload must not notify");

        rewrite(
            &file,
            r#"
services:
  core:
    - name: database
"#,
        );
        store.reload_and_notify();
        assert!(rx.try_recv().is_ok(), "successful reload notifies");
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn test_toggling_dependency_changes_validation_outcome() {
        let (store, file) = store_with(
            r#"
services:
  core:
    - name: database
      enabled: false
  app:
    - name: api
      dependencies:
        - database
"#,
        );
        assert!(store.validate_dependencies("api").is_err());

        rewrite(
            &file,
            r#"
services:
  core:
    - name: database
      enabled: true
  app:
    - name: api
      dependencies:
        - database
"#,
        );
        store.reload().expect("reload");
        store.validate_dependencies("api").expect("now satisfied");
    }
}
