//! File-watch adapter for the config store.
//!
//! Watching is deliberately an adapter in front of
//! [`ConfigStore::reload_and_notify`]: production code spawns a
//! [`ConfigWatcher`], tests trigger reloads manually, and the orchestrator
//! only ever sees the store's change-notification channel either way.
//!
//! [`ConfigStore::reload_and_notify`]: crate::config::ConfigStore

use crate::config::ConfigStore;
use crate::error::{Error, Result};
use notify_debouncer_full::notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Debounce window for file events. Editors with format-on-save write the
/// file twice in quick succession; one reload covers both.
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Watches the services document and reloads the store on change.
///
/// Dropping the watcher stops watching; the store itself is unaffected.
pub struct ConfigWatcher {
    _debouncer: Debouncer<RecommendedWatcher, FileIdMap>,
}

impl ConfigWatcher {
    /// Start watching the store's backing file.
    ///
    /// The parent directory is watched non-recursively because many editors
    /// replace files by rename, which would slip past a watch on the file
    /// path itself.
    pub fn spawn(store: Arc<ConfigStore>) -> Result<Self> {
        let config_path = canonical_or_original(store.path());
        let watch_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                Error::Filesystem(format!(
                    "Config path '{}' has no parent directory to watch",
                    config_path.display()
                ))
            })?;

        let mut debouncer = new_debouncer(
            DEBOUNCE_WINDOW,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let touches_config = events.iter().any(|event| {
                        event
                            .paths
                            .iter()
                            .any(|p| canonical_or_original(p) == config_path)
                    });
                    if touches_config {
                        store.reload_and_notify();
                    }
                }
                Err(errors) => {
                    tracing::warn!("Config watch error: {:?}", errors);
                }
            },
        )
        .map_err(|e| Error::Filesystem(format!("Failed to create config watcher: {}", e)))?;

        debouncer
            .watcher()
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                Error::Filesystem(format!(
                    "Failed to watch directory '{}': {}",
                    watch_dir.display(),
                    e
                ))
            })?;
        tracing::debug!("Watching config directory '{}'", watch_dir.display());

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}

/// Resolve symlinks for stable path comparison; fall back to the raw path
/// when the file is mid-replace and briefly absent.
fn canonical_or_original(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_spawn_on_real_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("services.yaml");
        let mut file = std::fs::File::create(&path).expect("create config");
        file.write_all(b"services: {}\n").expect("write config");
        drop(file);

        let store = Arc::new(ConfigStore::load(&path).expect("load"));
        let watcher = ConfigWatcher::spawn(Arc::clone(&store)).expect("spawn watcher");
        drop(watcher);
    }

    #[test]
    fn test_canonical_or_original_missing_path() {
        let path = Path::new("/definitely/not/there.yaml");
        assert_eq!(canonical_or_original(path), path.to_path_buf());
    }
}
