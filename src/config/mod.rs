//! Services configuration: document parsing, snapshot store, queries.
//!
//! Submodules:
//!
//! - `duration` - human-readable duration strings (`"10s"`, `"500ms"`)
//! - `types` - per-service entry types (`ServiceConfig`, `DependencySpec`, ...)
//! - `parser` - YAML document -> immutable [`Snapshot`]
//! - `store` - [`ConfigStore`]: load, watch-driven reload, lookups

mod duration;
mod parser;
mod store;
mod types;

pub use duration::{format_duration, parse_duration};
pub use parser::{DocumentParser, Snapshot};
pub use store::{ConfigChanged, ConfigStore};
pub use types::{
    DependencySpec, HealthCheckConfig, HealthProbe, ServiceConfig, ServiceTimeouts,
    DEFAULT_TRANSITION_TIMEOUT,
};
