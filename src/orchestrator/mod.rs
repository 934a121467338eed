//! Service lifecycle supervision.
//!
//! - `core` - the [`Orchestrator`] struct, registration, status and health
//! - `lifecycle` - start/stop/restart, batch passes, config reconciliation

mod core;
mod lifecycle;

pub use self::core::Orchestrator;
