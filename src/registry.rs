//! Name → connector lookup, filled once at startup.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::connectors::Connector;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("connector already registered: {0}")]
    DuplicateName(String),

    #[error("unknown connector: {0}")]
    UnknownConnector(String),
}

/// Describes a registered connector for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorDescription {
    pub name: String,
    pub kind: String,
}

/// Holds all registered connectors. Registration needs `&mut self`, so once
/// the registry is shared behind an `Arc` it is read-only and needs no lock.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connector under `name`. An existing entry is never replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        connector: Arc<dyn Connector>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.connectors.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.connectors.insert(name, connector);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Connector>, RegistryError> {
        self.connectors
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownConnector(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.connectors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Name and kind of every connector, sorted by name.
    pub fn descriptions(&self) -> Vec<ConnectorDescription> {
        let mut out: Vec<ConnectorDescription> = self
            .connectors
            .iter()
            .map(|(name, c)| ConnectorDescription {
                name: name.clone(),
                kind: c.kind().to_string(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}
