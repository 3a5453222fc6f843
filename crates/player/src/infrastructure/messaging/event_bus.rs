//! Event Bus for session lifecycle notifications.
//!
//! Push-based: subscribers register callbacks that are invoked by the session
//! loop whenever the connection lifecycle changes. Snapshot changes travel on
//! the `watch` channel instead; the bus only carries discrete events.

use std::sync::Arc;

use tokio::sync::Mutex;

/// Lifecycle events surfaced to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A link to the server opened
    Connected,
    /// The link closed; `reconnecting` tells whether a retry is scheduled
    Disconnected { code: u16, reconnecting: bool },
    /// The retry budget is exhausted; the UI should return to its pre-session state
    ConnectionLost,
    /// The server ended the session and the session fields were reset
    SessionEnded,
}

type Subscriber = Box<dyn FnMut(ClientEvent) + Send + 'static>;

/// Fan-out of [`ClientEvent`]s. Clones share one subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks run on the session loop, so they must not block.
    pub async fn subscribe(&self, callback: impl FnMut(ClientEvent) + Send + 'static) {
        self.subscribers.lock().await.push(Box::new(callback));
    }

    /// Dispatch an event to all subscribers, each receiving its own clone.
    pub async fn dispatch(&self, event: ClientEvent) {
        let mut subscribers = self.subscribers.lock().await;
        for subscriber in subscribers.iter_mut() {
            subscriber(event.clone());
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    pub async fn clear(&self) {
        self.subscribers.lock().await.clear();
    }
}
