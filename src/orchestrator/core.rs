//! The supervisor instance: registration, status bookkeeping, health.
//!
//! One `Orchestrator` owns the authoritative status of every registered
//! service. There is no global instance; whoever composes the process creates
//! one and passes it around, which also makes tests with several independent
//! supervisors trivial.

use crate::config::{ConfigChanged, ConfigStore};
use crate::error::{Error, Result};
use crate::events::{EventBus, LifecycleEvent};
use crate::service::{Service, ServiceStatus, StatusRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

use super::lifecycle::InflightMap;

/// Shared handle to one registered service. The per-service mutex serializes
/// `start`/`stop` calls into the implementation.
pub(super) type ServiceHandle = Arc<Mutex<Box<dyn Service>>>;
/// Registry of all registered services, keyed by name.
type ServiceRegistry = HashMap<String, ServiceHandle>;
/// Shared status map; the orchestrator is the only writer.
pub(super) type StatusMap = Arc<RwLock<HashMap<String, StatusRecord>>>;

/// Supervises registered services: starts and stops them in config order,
/// enforces transition timeouts, reconciles against config changes and
/// answers health queries.
///
/// # Concurrency model
///
/// All methods take `&self`; interior mutability lives behind tokio locks.
/// Individual `start`/`stop` calls run concurrently across different
/// services, while `start_all`, `stop_all` and `reconcile` serialize on a
/// batch lock so two passes never issue contradictory transitions for the
/// same service. A config change arriving mid-batch simply queues on that
/// lock.
pub struct Orchestrator {
    pub(super) config: Arc<ConfigStore>,
    pub(super) services: RwLock<ServiceRegistry>,
    pub(super) statuses: StatusMap,
    /// In-flight starts, keyed by name. Concurrent callers join the pending
    /// operation instead of invoking the service twice.
    pub(super) starting: InflightMap,
    /// In-flight stops, same dedup guarantee as `starting`.
    pub(super) stopping: InflightMap,
    pub(super) events: EventBus,
    /// Serializes whole-set passes (`start_all`/`stop_all`/`reconcile`).
    pub(super) batch_lock: Mutex<()>,
}

impl Orchestrator {
    /// Create a supervisor over the given config store.
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self {
            config,
            services: RwLock::new(HashMap::new()),
            statuses: Arc::new(RwLock::new(HashMap::new())),
            starting: InflightMap::default(),
            stopping: InflightMap::default(),
            events: EventBus::default(),
            batch_lock: Mutex::new(()),
        }
    }

    /// The config store this supervisor consults.
    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Register a service under the name it reports.
    ///
    /// Registration is one-shot for the process lifetime: re-registering an
    /// existing name fails with [`Error::DuplicateService`], and there is no
    /// unregister. The initial tracked status is `Stopped`.
    pub async fn register(&self, service: Box<dyn Service>) -> Result<()> {
        let name = service.name().to_string();
        let mut services = self.services.write().await;
        if services.contains_key(&name) {
            return Err(Error::DuplicateService(name));
        }
        services.insert(name.clone(), Arc::new(Mutex::new(service)));
        self.statuses
            .write()
            .await
            .insert(name.clone(), StatusRecord::new());
        tracing::info!("Registered service '{}'", name);
        Ok(())
    }

    /// Tracked status of a registered service.
    pub async fn status(&self, name: &str) -> Result<ServiceStatus> {
        self.statuses
            .read()
            .await
            .get(name)
            .map(|record| record.status)
            .ok_or_else(|| Error::ServiceNotRegistered(name.to_string()))
    }

    /// Snapshot of every registered service's status record.
    pub async fn statuses(&self) -> HashMap<String, StatusRecord> {
        self.statuses.read().await.clone()
    }

    /// Per-service health: `true` iff the tracked status is exactly
    /// `Running`. Contains one entry per registered service.
    pub async fn health(&self) -> HashMap<String, bool> {
        self.statuses
            .read()
            .await
            .iter()
            .map(|(name, record)| (name.clone(), record.status == ServiceStatus::Running))
            .collect()
    }

    /// Aggregate health: every registered service is `Running`.
    pub async fn is_healthy(&self) -> bool {
        self.statuses
            .read()
            .await
            .values()
            .all(|record| record.status == ServiceStatus::Running)
    }

    /// Subscribe to lifecycle events ([`LifecycleEvent`]).
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Wire the config store's change notifications to [`reconcile`].
    ///
    /// Runs until the config store is dropped. Reconciliation failures are
    /// logged, not fatal: the affected services stay in `Error` and remain
    /// visible through [`health`].
    ///
    /// [`reconcile`]: super::Orchestrator::reconcile
    /// [`health`]: super::Orchestrator::health
    pub fn spawn_config_listener(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let mut rx = orchestrator.config.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ConfigChanged) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Reconciliation converges on the latest snapshot, so
                        // missed notifications collapse into this one pass.
                        tracing::warn!("Config listener lagged, missed {} notifications", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                tracing::info!("Services config changed, reconciling running set");
                if let Err(e) = orchestrator.reconcile().await {
                    tracing::warn!("Reconciliation finished with failures: {}", e);
                }
            }
        })
    }

    pub(super) async fn service_handle(&self, name: &str) -> Result<ServiceHandle> {
        self.services
            .read()
            .await
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| Error::ServiceNotRegistered(name.to_string()))
    }

    pub(super) async fn is_registered(&self, name: &str) -> bool {
        self.services.read().await.contains_key(name)
    }

    pub(super) async fn current_status(&self, name: &str) -> Option<ServiceStatus> {
        self.statuses.read().await.get(name).map(|r| r.status)
    }

    /// Apply a status transition. The supervisor is the only caller; an
    /// invalid transition indicates overlapping operations (e.g. a start
    /// issued while a stop is in flight) and is logged, then applied anyway
    /// so the tracked status follows the most recent intent.
    pub(super) async fn set_status(&self, name: &str, to: ServiceStatus) {
        let mut statuses = self.statuses.write().await;
        if let Some(record) = statuses.get_mut(name) {
            if !record.status.is_valid_transition(to) {
                tracing::warn!(
                    "Unusual status transition for '{}': {} -> {}",
                    name,
                    record.status,
                    to
                );
            }
            record.transition(to);
        }
    }
}
