pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::connectors::{ConnectionRequest, ConnectionResult};

/// One routed request as remembered by the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: String,
    pub source: String,
    pub destination: String,
    pub result: ConnectionResult,
}

/// Where routed results are kept. Could be SQLite, a file, a remote sink.
#[async_trait]
pub trait Journal: Send + Sync {
    async fn record(&self, request: &ConnectionRequest, result: &ConnectionResult) -> Result<()>;
    /// The newest `limit` entries, oldest first.
    async fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>>;
    async fn clear(&self) -> Result<()>;
}
