use async_trait::async_trait;

use super::{Connector, Link, reject_blank_endpoints};
use crate::events::{Event, EventBus};

/// In-process connector. Links any two non-blank endpoints.
pub struct NativeConnector {
    name: String,
    events: EventBus,
}

impl NativeConnector {
    /// `name` is only used to label events.
    pub fn new(name: impl Into<String>, events: EventBus) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }
}

#[async_trait]
impl Connector for NativeConnector {
    fn kind(&self) -> &str {
        "native"
    }

    async fn connect(&self, source: &str, destination: &str) -> Link {
        if let Some(rejected) = reject_blank_endpoints(source, destination) {
            return rejected;
        }
        Link::connected()
            .with("source_type", "native")
            .with("source", source)
            .with("destination", destination)
    }

    async fn process_data(&self, payload: &str) {
        if payload.is_empty() {
            self.events.emit(Event::DataDropped {
                connector: self.name.clone(),
                reason: "empty payload".to_string(),
            });
            return;
        }
        self.events.emit(Event::DataTransfer {
            connector: self.name.clone(),
            bytes: payload.len(),
        });
    }
}
