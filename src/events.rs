//! Lifecycle events emitted by the supervisor for external monitoring.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event published when a service's tracked status changes through a
/// completed transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// A start completed and the service is now running.
    ServiceStarted { name: String },
    /// A stop completed and the service is now stopped.
    ServiceStopped { name: String },
    /// A start or stop failed or timed out; `cause` carries the rendered
    /// underlying error.
    ServiceError { name: String, cause: String },
}

impl LifecycleEvent {
    /// Name of the service the event concerns.
    pub fn service_name(&self) -> &str {
        match self {
            LifecycleEvent::ServiceStarted { name }
            | LifecycleEvent::ServiceStopped { name }
            | LifecycleEvent::ServiceError { name, .. } => name,
        }
    }

    /// Event kind as a string, for filtering and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::ServiceStarted { .. } => "service_started",
            LifecycleEvent::ServiceStopped { .. } => "service_stopped",
            LifecycleEvent::ServiceError { .. } => "service_error",
        }
    }
}

/// Broadcast bus carrying [`LifecycleEvent`]s to any number of subscribers.
///
/// Slow subscribers may lag and miss events; monitoring consumers should
/// treat the health query surface as the source of truth and events as a
/// change feed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Dropped silently when nobody is subscribed.
    pub fn publish(&self, event: LifecycleEvent) {
        tracing::debug!(kind = event.kind(), service = event.service_name(), "lifecycle event");
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(LifecycleEvent::ServiceStarted {
            name: "api".to_string(),
        });
        let event = rx.recv().await.expect("event delivered");
        assert_eq!(event.service_name(), "api");
        assert_eq!(event.kind(), "service_started");
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new(8);
        bus.publish(LifecycleEvent::ServiceError {
            name: "db".to_string(),
            cause: "boom".to_string(),
        });
    }
}
