//! Lifecycle events of the dispatch pipeline
//!
//! The EventBus uses `tokio::sync::broadcast` to decouple dispatch from
//! observers (timing, auditing, access logs). Every dispatched call emits a
//! `request` event before the handler runs and a `response` event once the
//! envelope is computed, on success and on failure alike.
//!
//! ```text
//! Dispatcher ──▶ EventBus::publish() ──▶ broadcast channel ──▶ subscribers
//! ```
//!
//! Publishing never blocks and never fails. A slow or broken subscriber
//! only loses events (lagged); it cannot alter a response.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut rx = registry.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(envelope) = rx.recv().await {
//!         if let LifecycleEvent::Response { context, status, elapsed_ms } = &envelope.event {
//!             tracing::info!(request_id = %context.id(), status, elapsed_ms, "done");
//!         }
//!     }
//! });
//! ```

use crate::core::context::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

/// Events emitted around each dispatched call
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// The context was built and the handler is about to run
    Request { context: Arc<Context> },
    /// The envelope was computed
    Response {
        context: Arc<Context>,
        /// HTTP status of the envelope
        status: u16,
        elapsed_ms: i64,
    },
}

impl LifecycleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::Request { .. } => "request",
            LifecycleEvent::Response { .. } => "response",
        }
    }

    /// The context of the call this event belongs to
    pub fn context(&self) -> &Arc<Context> {
        match self {
            LifecycleEvent::Request { context } | LifecycleEvent::Response { context, .. } => {
                context
            }
        }
    }
}

/// Envelope wrapping a lifecycle event with metadata
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: LifecycleEvent,
}

impl EventEnvelope {
    pub fn new(event: LifecycleEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// Cheap to clone; all clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    ///
    /// The capacity determines how many events can be buffered before
    /// slow receivers start losing events (lagged).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers that will receive the event; zero
    /// when nobody listens.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        self.sender.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Subscribe to every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Subscribe as a `Stream`; lagged items surface as errors
    pub fn subscribe_stream(&self) -> BroadcastStream<EventEnvelope> {
        BroadcastStream::new(self.sender.subscribe())
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
