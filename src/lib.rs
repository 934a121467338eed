//! # Conductor
//!
//! A single-process service lifecycle supervisor: register named long-running
//! services, start and stop them in config-driven priority order with
//! per-transition timeouts, react to live configuration changes by touching
//! only the affected services, and answer aggregate health queries.
//!
//! ## Features
//!
//! - **Ordered lifecycle**: `start_all` walks services ascending by startup
//!   priority (declaration order on ties); `stop_all` walks the exact reverse
//! - **Dependency gating**: required dependencies block a start when missing
//!   or disabled, optional ones only warn; re-checked on every start
//! - **Timeout enforcement**: each transition races a configured timer, a
//!   lost race marks the service `Error` and abandons (never cancels) the call
//! - **In-flight deduplication**: concurrent starts of the same service join
//!   one pending operation, the underlying `start()` runs exactly once
//! - **Reconciliation**: a config edit stops newly disabled services and
//!   starts newly enabled ones, leaving the rest untouched
//! - **Lifecycle events**: started/stopped/error notifications over a
//!   broadcast channel for external monitoring
//!
//! ## Quick Start
//!
//! ```no_run
//! use conductor::{ConfigStore, ConfigWatcher, Orchestrator};
//! use std::sync::Arc;
//!
//! # async fn example(database: Box<dyn conductor::Service>) -> Result<(), conductor::Error> {
//! let store = Arc::new(ConfigStore::load("services.yaml")?);
//! let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&store)));
//!
//! orchestrator.register(database).await?;
//!
//! // React to config file edits for the rest of the process lifetime.
//! let _watcher = ConfigWatcher::spawn(Arc::clone(&store))?;
//! orchestrator.spawn_config_listener();
//!
//! orchestrator.start_all().await?;
//! assert!(orchestrator.is_healthy().await);
//! # Ok(())
//! # }
//! ```
//!
//! ## What this crate is not
//!
//! The supervisor does not implement services, does not persist state across
//! process restarts, does not coordinate across machines, and does not retry
//! failed starts; retry and backoff policy belongs to the caller.

pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod service;
pub mod watch;

// Re-export commonly used types
pub use config::{ConfigChanged, ConfigStore, DocumentParser, ServiceConfig, ServiceTimeouts};
pub use error::{Error, Result};
pub use events::LifecycleEvent;
pub use orchestrator::Orchestrator;
pub use service::{Service, ServiceStatus, StatusRecord};
pub use watch::ConfigWatcher;
