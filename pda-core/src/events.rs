//! Typed publish/subscribe used by the Orchestrator to notify observers.
//!
//! Backed by [`tokio::sync::broadcast`]: every subscriber gets every event
//! published after it subscribes, independent of the others. A lagging
//! subscriber misses the oldest unread events rather than blocking
//! publication — the orchestrator's own event delivery never backpressures
//! on an observer.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::orchestrator::OrchestratorState;
use crate::result::ExecutionResult;

/// Severity attached to an `info` emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One notification published by an Orchestrator run. Within a run these are
/// strictly ordered in the sequence they occur; there is no ordering guarantee
/// across runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    StateChange {
        from: OrchestratorState,
        to: OrchestratorState,
    },
    InteractionRequest {
        request: crate::interaction::InteractionRequest,
    },
    InteractionResponse {
        response: crate::interaction::InteractionResponse,
    },
    Progress {
        current: u64,
        total: Option<u64>,
        status: Option<String>,
    },
    Info {
        message: String,
        level: InfoLevel,
    },
    Error {
        message: String,
    },
    Complete {
        result: ExecutionResult,
    },
}

/// A concrete pub/sub bus. Cloning yields a handle to the same underlying
/// channel, cheap to pass around (the broadcast sender is reference-counted).
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus with the given per-subscriber backlog capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to future events. Events published before this call are not
    /// replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish an event. Returns without error even if there are no
    /// subscribers; a publish with a full backlog and lagging subscribers
    /// still succeeds for this send (the lag is observed by the subscriber
    /// on its next receive, not by the publisher).
    pub fn emit(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_observes_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.emit(Event::Info {
            message: "hello".into(),
            level: InfoLevel::Info,
        });
        let received = rx.recv().await.unwrap();
        matches!(received, Event::Info { .. });
    }

    #[tokio::test]
    async fn emit_with_no_subscribers_does_not_error() {
        let bus = EventBus::default();
        bus.emit(Event::Error {
            message: "nobody is listening".into(),
        });
    }
}
