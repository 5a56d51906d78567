use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

use super::{Journal, JournalEntry};
use crate::connectors::{ConnectionRequest, ConnectionResult};

/// SQLite-backed journal of routed requests.
pub struct SqliteJournal {
    conn: Mutex<Connection>,
}

impl SqliteJournal {
    /// Open or create the journal table at `path`. Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open journal database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS journal (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL DEFAULT (datetime('now')),
                source      TEXT NOT NULL,
                destination TEXT NOT NULL,
                connector   TEXT NOT NULL,
                status      TEXT NOT NULL,
                result      TEXT NOT NULL
            )",
        )
        .context("failed to create journal table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("journal lock poisoned"))
    }
}

#[async_trait]
impl Journal for SqliteJournal {
    async fn record(&self, request: &ConnectionRequest, result: &ConnectionResult) -> Result<()> {
        let json = serde_json::to_string(result)?;
        let status = result.status().to_string();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO journal (source, destination, connector, status, result)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            [
                request.source_id(),
                request.destination_id(),
                result.connector_name(),
                status.as_str(),
                json.as_str(),
            ],
        )?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT timestamp, source, destination, result FROM (
                SELECT id, timestamp, source, destination, result
                FROM journal ORDER BY id DESC LIMIT ?1
            ) ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(timestamp, source, destination, json)| -> Result<JournalEntry> {
                Ok(JournalEntry {
                    timestamp,
                    source,
                    destination,
                    result: serde_json::from_str(&json)
                        .context("corrupt journal entry")?,
                })
            })
            .collect()
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM journal", [])?;
        Ok(())
    }
}
