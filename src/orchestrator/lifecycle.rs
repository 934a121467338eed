//! Start/stop transitions, batch passes and config reconciliation.
//!
//! Every transition races the service call against a timer. The timer
//! winning abandons the call rather than cancelling it: the service keeps
//! running on a detached task (holding its own mutex until it settles, a
//! documented limitation) and its late completion is ignored, because only
//! the racing side ever writes the tracked status.

use crate::error::{Error, Result};
use crate::events::LifecycleEvent;
use crate::service::ServiceStatus;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::core::{Orchestrator, ServiceHandle};

/// Failure of a single transition; `Clone` so every joiner of a shared
/// in-flight operation observes the same outcome.
#[derive(Debug, Clone)]
pub(super) enum TransitionError {
    TimedOut { after: Duration },
    Failed(String),
}

impl TransitionError {
    fn render(&self) -> String {
        match self {
            TransitionError::TimedOut { after } => {
                format!("timed out after {}ms", after.as_millis())
            }
            TransitionError::Failed(msg) => msg.clone(),
        }
    }

    fn into_error(self, service: &str, kind: TransitionKind) -> Error {
        match self {
            TransitionError::TimedOut { after } => Error::Timeout {
                service: service.to_string(),
                after,
            },
            TransitionError::Failed(msg) => match kind {
                TransitionKind::Start => Error::ServiceStartFailed(service.to_string(), msg),
                TransitionKind::Stop => Error::ServiceStopFailed(service.to_string(), msg),
            },
        }
    }
}

pub(super) type TransitionOutcome = std::result::Result<(), TransitionError>;
/// A pending transition that concurrent callers can await together.
pub(super) type SharedTransition = Shared<BoxFuture<'static, TransitionOutcome>>;
/// In-flight transitions keyed by service name.
pub(super) type InflightMap = Arc<Mutex<HashMap<String, SharedTransition>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionKind {
    Start,
    Stop,
}

impl TransitionKind {
    fn success_status(self) -> ServiceStatus {
        match self {
            TransitionKind::Start => ServiceStatus::Running,
            TransitionKind::Stop => ServiceStatus::Stopped,
        }
    }

    fn success_event(self, name: String) -> LifecycleEvent {
        match self {
            TransitionKind::Start => LifecycleEvent::ServiceStarted { name },
            TransitionKind::Stop => LifecycleEvent::ServiceStopped { name },
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionKind::Start => write!(f, "start"),
            TransitionKind::Stop => write!(f, "stop"),
        }
    }
}

impl Orchestrator {
    /// Start one service by name.
    ///
    /// Semantics, in order:
    /// - unknown name fails with [`Error::ServiceNotRegistered`];
    /// - already `Running` is a no-op;
    /// - declared disabled in config is an intentional skip (warn, `Ok`); a
    ///   service with no config entry at all is an operator override and
    ///   starts with default timeouts;
    /// - an in-flight start for the same name is joined, the underlying
    ///   `Service::start` runs exactly once;
    /// - unmet required dependencies fail with [`Error::Dependency`],
    ///   re-checked against the current config snapshot on every call;
    /// - otherwise the status goes `Starting` and the service call races the
    ///   configured `startup_timeout`.
    pub async fn start(&self, name: &str) -> Result<()> {
        let handle = self.service_handle(name).await?;

        if self.current_status(name).await == Some(ServiceStatus::Running) {
            tracing::debug!("Service '{}' already running", name);
            return Ok(());
        }
        match self.config.get(name) {
            Some(entry) if !entry.enabled => {
                tracing::warn!("Service '{}' is disabled, skipping start", name);
                return Ok(());
            }
            Some(_) => {}
            None => {
                tracing::debug!(
                    "Service '{}' has no config entry, starting with defaults",
                    name
                );
            }
        }

        let pending = {
            let mut starting = self.starting.lock().await;
            if let Some(existing) = starting.get(name) {
                tracing::debug!("Joining in-flight start for '{}'", name);
                existing.clone()
            } else {
                // A start that completed while we waited for the lock leaves
                // the service Running with no in-flight entry; re-check under
                // the lock so it is not started a second time.
                if self.current_status(name).await == Some(ServiceStatus::Running) {
                    tracing::debug!("Service '{}' already running", name);
                    return Ok(());
                }
                self.config.validate_dependencies(name)?;
                self.set_status(name, ServiceStatus::Starting).await;
                let timeout = self.config.timeouts(name).startup;
                let transition =
                    self.spawn_transition(name, handle, timeout, TransitionKind::Start);
                starting.insert(name.to_string(), transition.clone());
                transition
            }
        };

        pending
            .await
            .map_err(|cause| cause.into_error(name, TransitionKind::Start))
    }

    /// Stop one service by name. Symmetric to [`start`](Self::start): no-op
    /// if already `Stopped`, joins an in-flight stop, races the configured
    /// `shutdown_timeout`. Enablement and dependencies are not consulted.
    pub async fn stop(&self, name: &str) -> Result<()> {
        let handle = self.service_handle(name).await?;

        if self.current_status(name).await == Some(ServiceStatus::Stopped) {
            tracing::debug!("Service '{}' already stopped", name);
            return Ok(());
        }

        let pending = {
            let mut stopping = self.stopping.lock().await;
            if let Some(existing) = stopping.get(name) {
                tracing::debug!("Joining in-flight stop for '{}'", name);
                existing.clone()
            } else {
                // Same re-check as in start: a stop finishing between the
                // status check above and this lock must not run twice.
                if self.current_status(name).await == Some(ServiceStatus::Stopped) {
                    tracing::debug!("Service '{}' already stopped", name);
                    return Ok(());
                }
                self.set_status(name, ServiceStatus::Stopping).await;
                let timeout = self.config.timeouts(name).shutdown;
                let transition =
                    self.spawn_transition(name, handle, timeout, TransitionKind::Stop);
                stopping.insert(name.to_string(), transition.clone());
                transition
            }
        };

        pending
            .await
            .map_err(|cause| cause.into_error(name, TransitionKind::Stop))
    }

    /// Stop then start. A failed stop aborts the restart: starting a service
    /// that did not shut down cleanly is not attempted.
    pub async fn restart(&self, name: &str) -> Result<()> {
        self.stop(name).await?;
        self.start(name).await
    }

    /// Start every enabled, registered service in startup order.
    ///
    /// Sequential by design: a dependency is `Running` before any dependent's
    /// start is invoked. One service failing does not abort the pass;
    /// failures are collected and returned as one [`Error::Multiple`] after
    /// every service has been attempted.
    pub async fn start_all(&self) -> Result<()> {
        let _batch = self.batch_lock.lock().await;
        let order = self.config.startup_order();
        tracing::info!("Starting all services ({} known)", order.len());
        self.start_pass(&order, &[]).await
    }

    /// Stop every running service in reverse startup order, collecting
    /// failures like [`start_all`](Self::start_all).
    pub async fn stop_all(&self) -> Result<()> {
        let _batch = self.batch_lock.lock().await;
        let mut order = self.config.startup_order();
        order.reverse();
        tracing::info!("Stopping all services");

        let mut failures = Vec::new();
        for name in &order {
            if self.current_status(name).await != Some(ServiceStatus::Running) {
                continue;
            }
            if let Err(e) = self.stop(name).await {
                tracing::warn!("Failed to stop '{}': {}", name, e);
                failures.push(e);
            }
        }
        Self::batch_result(failures)
    }

    /// Converge the running set to the current config snapshot.
    ///
    /// Running services whose config is now disabled are stopped; enabled
    /// services not running before this pass are started in startup order.
    /// Services unaffected by the change are left alone.
    pub async fn reconcile(&self) -> Result<()> {
        let _batch = self.batch_lock.lock().await;

        let running: Vec<String> = self
            .statuses()
            .await
            .into_iter()
            .filter(|(_, record)| record.status == ServiceStatus::Running)
            .map(|(name, _)| name)
            .collect();

        let mut failures = Vec::new();
        for name in &running {
            if !self.config.is_enabled(name) {
                tracing::info!("Service '{}' disabled by config change, stopping", name);
                if let Err(e) = self.stop(name).await {
                    tracing::warn!("Failed to stop '{}': {}", name, e);
                    failures.push(e);
                }
            }
        }

        let order = self.config.startup_order();
        match self.start_pass(&order, &running).await {
            Ok(()) => {}
            Err(Error::Multiple(errors)) => failures.extend(errors),
            Err(e) => failures.push(e),
        }
        Self::batch_result(failures)
    }

    /// One sequential start pass over `order`, skipping disabled entries,
    /// names in `already_running`, and names declared in config but never
    /// registered with this supervisor.
    async fn start_pass(&self, order: &[String], already_running: &[String]) -> Result<()> {
        let mut failures = Vec::new();
        for name in order {
            if !self.config.is_enabled(name) {
                tracing::debug!("Service '{}' disabled, skipping", name);
                continue;
            }
            if already_running.iter().any(|r| r == name) {
                continue;
            }
            if !self.is_registered(name).await {
                tracing::warn!("Service '{}' is configured but not registered, skipping", name);
                continue;
            }
            if let Err(e) = self.start(name).await {
                tracing::warn!("Failed to start '{}': {}", name, e);
                failures.push(e);
            }
        }
        Self::batch_result(failures)
    }

    fn batch_result(failures: Vec<Error>) -> Result<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Multiple(failures))
        }
    }

    /// Run one transition as a shared future: spawn the service call as a
    /// detached task, race it against the timeout, record the outcome and
    /// publish the event, then remove the in-flight entry.
    fn spawn_transition(
        &self,
        name: &str,
        handle: ServiceHandle,
        timeout: Duration,
        kind: TransitionKind,
    ) -> SharedTransition {
        let name = name.to_string();
        let statuses = Arc::clone(&self.statuses);
        let events = self.events.clone();
        let inflight = match kind {
            TransitionKind::Start => Arc::clone(&self.starting),
            TransitionKind::Stop => Arc::clone(&self.stopping),
        };

        async move {
            let call = tokio::spawn({
                let handle = Arc::clone(&handle);
                async move {
                    let mut service = handle.lock().await;
                    match kind {
                        TransitionKind::Start => service.start().await,
                        TransitionKind::Stop => service.stop().await,
                    }
                }
            });

            // Dropping `call` on timeout leaves the task running detached;
            // the service mutex stays held until it settles on its own.
            let outcome: TransitionOutcome = tokio::select! {
                joined = call => match joined {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(TransitionError::Failed(e.to_string())),
                    Err(join_err) => {
                        Err(TransitionError::Failed(format!("{} task panicked: {}", kind, join_err)))
                    }
                },
                () = tokio::time::sleep(timeout) => {
                    Err(TransitionError::TimedOut { after: timeout })
                }
            };

            {
                let mut statuses = statuses.write().await;
                if let Some(record) = statuses.get_mut(&name) {
                    match &outcome {
                        Ok(()) => record.transition(kind.success_status()),
                        Err(cause) => record.fail(cause.render()),
                    }
                }
            }

            match &outcome {
                Ok(()) => {
                    tracing::info!("Service '{}' {} completed", name, kind);
                    events.publish(kind.success_event(name.clone()));
                }
                Err(cause) => {
                    tracing::error!("Service '{}' {} failed: {}", name, kind, cause.render());
                    events.publish(LifecycleEvent::ServiceError {
                        name: name.clone(),
                        cause: cause.render(),
                    });
                }
            }

            inflight.lock().await.remove(&name);
            outcome
        }
        .boxed()
        .shared()
    }
}
