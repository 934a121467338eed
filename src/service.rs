//! The contract between the supervisor and the units it supervises.
//!
//! A supervised service exposes exactly start, stop, a self-reported status
//! and a name. The supervisor never looks past this trait; everything else
//! (ordering, timeouts, dependency gating) comes from the config.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status tracked by the supervisor for each registered service.
///
/// The supervisor owns exactly one status per service name and is the only
/// writer. The machine:
///
/// ```text
/// Stopped ──► Starting ──► Running
///    ▲            │           │
///    │            ▼           ▼
///    └──────── Error ◄──── Stopping
/// ```
///
/// `Error` is terminal for the transition that produced it: the service stays
/// visibly unhealthy until an explicit stop or restart clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Not running; initial state and the safe state to retry from.
    Stopped,
    /// A start is in flight.
    Starting,
    /// Start completed successfully.
    Running,
    /// A stop is in flight.
    Stopping,
    /// A start or stop timed out or failed.
    Error,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Stopped => write!(f, "stopped"),
            ServiceStatus::Starting => write!(f, "starting"),
            ServiceStatus::Running => write!(f, "running"),
            ServiceStatus::Stopping => write!(f, "stopping"),
            ServiceStatus::Error => write!(f, "error"),
        }
    }
}

impl ServiceStatus {
    /// Check whether a transition is one the supervisor can legally perform.
    ///
    /// Same-state transitions are valid no-ops. `Error` can only be left via
    /// `Starting` (restart) or `Stopping` (explicit stop).
    pub fn is_valid_transition(&self, to: ServiceStatus) -> bool {
        use ServiceStatus::*;
        match (self, to) {
            (Stopped, Starting) => true,
            (Starting, Running) => true,
            (Starting, Error) => true,
            (Running, Stopping) => true,
            (Stopping, Stopped) => true,
            (Stopping, Error) => true,
            (Error, Starting) => true,
            (Error, Stopping) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }
}

/// Per-service record kept by the supervisor alongside the raw status.
#[derive(Debug, Clone)]
pub struct StatusRecord {
    pub status: ServiceStatus,
    /// When the current status was entered.
    pub since: DateTime<Utc>,
    /// Message from the most recent failed transition, cleared on the next
    /// successful start.
    pub last_error: Option<String>,
}

impl StatusRecord {
    pub(crate) fn new() -> Self {
        Self {
            status: ServiceStatus::Stopped,
            since: Utc::now(),
            last_error: None,
        }
    }

    pub(crate) fn transition(&mut self, to: ServiceStatus) {
        self.status = to;
        self.since = Utc::now();
        if to == ServiceStatus::Running {
            self.last_error = None;
        }
    }

    pub(crate) fn fail(&mut self, cause: String) {
        self.status = ServiceStatus::Error;
        self.since = Utc::now();
        self.last_error = Some(cause);
    }
}

/// A supervised long-running unit of work.
///
/// Implementations are registered once and owned by the supervisor for the
/// rest of the process lifetime. `start` and `stop` must settle eventually;
/// when one outlives its configured timeout the supervisor stops waiting and
/// marks the service [`ServiceStatus::Error`], but does not cancel the call —
/// the implementation keeps running detached and its late completion is
/// ignored.
#[async_trait]
pub trait Service: Send + Sync {
    /// Bring the service up. Returns once it is ready to do work.
    async fn start(&mut self) -> Result<()>;

    /// Bring the service down gracefully.
    async fn stop(&mut self) -> Result<()>;

    /// The service's own view of its readiness. Reported alongside (not
    /// instead of) the status the supervisor tracks.
    fn status(&self) -> ServiceStatus;

    /// Stable identifier; must match the name used in the services config.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lowercase() {
        assert_eq!(ServiceStatus::Stopped.to_string(), "stopped");
        assert_eq!(ServiceStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_valid_transitions() {
        use ServiceStatus::*;
        assert!(Stopped.is_valid_transition(Starting));
        assert!(Starting.is_valid_transition(Running));
        assert!(Starting.is_valid_transition(Error));
        assert!(Running.is_valid_transition(Stopping));
        assert!(Stopping.is_valid_transition(Stopped));
        assert!(Stopping.is_valid_transition(Error));
        assert!(Error.is_valid_transition(Starting));
        assert!(Error.is_valid_transition(Stopping));
    }

    #[test]
    fn test_invalid_transitions() {
        use ServiceStatus::*;
        // Must pass through the transient states.
        assert!(!Stopped.is_valid_transition(Running));
        assert!(!Running.is_valid_transition(Stopped));
        assert!(!Starting.is_valid_transition(Stopping));
        assert!(!Stopping.is_valid_transition(Running));
        assert!(!Running.is_valid_transition(Starting));
    }

    #[test]
    fn test_same_state_is_noop() {
        use ServiceStatus::*;
        for s in [Stopped, Starting, Running, Stopping, Error] {
            assert!(s.is_valid_transition(s));
        }
    }

    #[test]
    fn test_record_clears_error_on_running() {
        let mut record = StatusRecord::new();
        record.fail("boom".to_string());
        assert_eq!(record.status, ServiceStatus::Error);
        assert!(record.last_error.is_some());

        record.transition(ServiceStatus::Starting);
        record.transition(ServiceStatus::Running);
        assert!(record.last_error.is_none());
    }
}
