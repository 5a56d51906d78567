//! Observability side channel for connectors and the gateway.
//!
//! Components emit events via [`EventBus::emit`] and subscribe via
//! [`EventBus::subscribe`]. Built on [`tokio::sync::broadcast`] so the
//! tracing logger, the journal, and tests can all listen independently.
//! Emitting never fails: with no subscribers the event is simply dropped.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::connectors::Status;

/// Events that flow through the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A connector was added to the registry at startup.
    Registered { name: String, kind: String },
    /// A request was routed (successfully or not).
    Connection {
        connector: String,
        source: String,
        destination: String,
        status: Status,
    },
    /// A connector accepted a payload.
    DataTransfer { connector: String, bytes: usize },
    /// A payload never reached a connector.
    DataDropped { connector: String, reason: String },
    /// A connector accepted a payload but could not process it.
    ProcessingFailed { connector: String, error: String },
}

/// A broadcast channel that any component can emit to or subscribe from.
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Forward every event to `tracing` from a background task.
    /// The task ends once every sender handle has been dropped.
    pub fn spawn_logger(&self) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => log_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event logger fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

fn log_event(event: &Event) {
    match event {
        Event::Registered { name, kind } => {
            tracing::debug!(connector = %name, kind = %kind, "connector registered");
        }
        Event::Connection {
            connector,
            source,
            destination,
            status,
        } => match status {
            Status::Connected => {
                tracing::info!(%connector, %source, %destination, "connection established");
            }
            Status::Failed => {
                tracing::warn!(%connector, %source, %destination, "connection failed");
            }
        },
        Event::DataTransfer { connector, bytes } => {
            tracing::info!(%connector, bytes, "data transfer");
        }
        Event::DataDropped { connector, reason } => {
            tracing::warn!(%connector, %reason, "data dropped");
        }
        Event::ProcessingFailed { connector, error } => {
            tracing::error!(%connector, %error, "data processing failed");
        }
    }
}
