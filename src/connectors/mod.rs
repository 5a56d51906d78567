pub mod language;
pub mod mock;
pub mod native;
pub mod process;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Detail key carrying the failure reason on every failed result.
pub const REASON: &str = "reason";

pub const REASON_UNKNOWN_CONNECTOR: &str = "unknown_connector";
pub const REASON_INVALID_ENDPOINT: &str = "invalid_endpoint";
pub const REASON_TIMEOUT: &str = "timeout";
pub const REASON_PROCESS_FAILED: &str = "process_failed";
pub const REASON_SPAWN_FAILED: &str = "spawn_failed";

/// Free-form connection metadata.
pub type Detail = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Connected,
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Connected => write!(f, "connected"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

/// What a connector reports back. Failures are information, not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub status: Status,
    pub detail: Detail,
}

impl Link {
    pub fn connected() -> Self {
        Self {
            status: Status::Connected,
            detail: Detail::new(),
        }
    }

    pub fn failed(reason: &str) -> Self {
        Self {
            status: Status::Failed,
            detail: Detail::from([(REASON.to_string(), reason.to_string())]),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.detail.insert(key.to_string(), value.into());
        self
    }

    pub fn is_connected(&self) -> bool {
        self.status == Status::Connected
    }
}

/// A request to link `source_id` and `destination_id` through a named connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    source_id: String,
    destination_id: String,
    connector_name: String,
}

impl ConnectionRequest {
    pub fn new(
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        connector_name: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            connector_name: connector_name.into(),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    pub fn connector_name(&self) -> &str {
        &self.connector_name
    }
}

/// Outcome of routing one request. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionResult {
    status: Status,
    connector_name: String,
    detail: Detail,
}

impl ConnectionResult {
    /// Attach the name the connector was resolved under to what it reported.
    pub fn new(connector_name: impl Into<String>, link: Link) -> Self {
        Self {
            status: link.status,
            connector_name: connector_name.into(),
            detail: link.detail,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn connector_name(&self) -> &str {
        &self.connector_name
    }

    pub fn detail(&self) -> &Detail {
        &self.detail
    }

    /// The `reason` detail, present on every failed result.
    pub fn reason(&self) -> Option<&str> {
        self.detail.get(REASON).map(String::as_str)
    }

    pub fn is_connected(&self) -> bool {
        self.status == Status::Connected
    }
}

/// Something the gateway can route through.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Short description of the implementation, e.g. `"native"`.
    fn kind(&self) -> &str;

    /// Attempt to link `source` and `destination`. Must not panic on odd
    /// input; report a failed [`Link`] instead.
    async fn connect(&self, source: &str, destination: &str) -> Link;

    /// Hand a payload to the connector. Fire-and-forget: problems are
    /// reported on the event bus, never to the caller.
    async fn process_data(&self, payload: &str);
}

/// Shared endpoint validation. Returns the failed link for blank endpoints.
pub fn reject_blank_endpoints(source: &str, destination: &str) -> Option<Link> {
    if source.trim().is_empty() {
        return Some(Link::failed(REASON_INVALID_ENDPOINT).with("message", "source is empty"));
    }
    if destination.trim().is_empty() {
        return Some(
            Link::failed(REASON_INVALID_ENDPOINT).with("message", "destination is empty"),
        );
    }
    None
}
