//! Configuration types for supervised services.
//!
//! Each entry in the services document describes one supervised service:
//! whether it is enabled, where it sits in the startup order, how long its
//! lifecycle transitions may take, what it depends on, and an optional
//! health-check descriptor for external monitoring.

use super::duration::serde_duration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout applied to both startup and shutdown when unset,
/// and for services the config does not know about.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default health-check polling interval.
const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

fn default_enabled() -> bool {
    true
}

fn default_timeout() -> Duration {
    DEFAULT_TRANSITION_TIMEOUT
}

fn default_interval() -> Duration {
    DEFAULT_HEALTH_INTERVAL
}

/// Configuration for a single supervised service.
///
/// One immutable value per snapshot; the store replaces whole snapshots on
/// reload so readers never observe a partially updated entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Unique identifier, stable across reloads.
    pub name: String,

    /// Disabled services are never started by batch operations and are
    /// stopped by reconciliation if currently running.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Lower values start earlier. Ties break by declaration order.
    #[serde(default)]
    pub startup_priority: i32,

    #[serde(default = "default_timeout", with = "serde_duration")]
    pub startup_timeout: Duration,

    #[serde(default = "default_timeout", with = "serde_duration")]
    pub shutdown_timeout: Duration,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencySpec>,

    /// Consumed by external monitoring; the supervisor stores but never
    /// interprets it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthCheckConfig>,

    /// Category the entry was declared under ("core", "app", ...). Filled in
    /// during parsing, purely organizational.
    #[serde(skip)]
    pub category: String,
}

/// Dependency reference - supports both a bare service name and a structured
/// form with a `required` flag.
///
/// ```yaml
/// dependencies:
///   - database              # required
///   - service: metrics
///     required: false       # optional, missing only warns
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Bare service name; treated as required.
    Simple(String),
    /// Structured dependency with explicit requiredness.
    Detailed {
        service: String,
        #[serde(default = "default_enabled")]
        required: bool,
    },
}

impl DependencySpec {
    /// The name of the depended-upon service.
    pub fn service_name(&self) -> &str {
        match self {
            DependencySpec::Simple(name) => name,
            DependencySpec::Detailed { service, .. } => service,
        }
    }

    /// Whether an unmet dependency blocks startup (true) or only warns.
    pub fn is_required(&self) -> bool {
        match self {
            DependencySpec::Simple(_) => true,
            DependencySpec::Detailed { required, .. } => *required,
        }
    }
}

/// Startup and shutdown bounds for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTimeouts {
    pub startup: Duration,
    pub shutdown: Duration,
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self {
            startup: DEFAULT_TRANSITION_TIMEOUT,
            shutdown: DEFAULT_TRANSITION_TIMEOUT,
        }
    }
}

/// Health-check descriptor attached to a service entry.
///
/// The supervisor exposes this to callers (liveness endpoints, monitors) and
/// does not run the probe itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_interval", with = "serde_duration")]
    pub interval: Duration,

    #[serde(default = "default_timeout", with = "serde_duration")]
    pub timeout: Duration,

    #[serde(flatten)]
    pub probe: HealthProbe,
}

/// Probe method for a health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HealthProbe {
    /// HTTP GET against the given URL.
    HttpGet {
        #[serde(rename = "httpGet")]
        http_get: String,
    },
    /// Shell command exiting zero when healthy.
    Command { command: String },
}
