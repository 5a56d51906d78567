//! Startup configuration: which connectors exist and how the gateway behaves.
//!
//! Read from a JSON file (see [`default_config_path`](crate::consts::default_config_path)).
//! A missing file is not an error; the built-in connector set is used instead.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::connectors::Connector;
use crate::connectors::language::{Language, LanguageConnector};
use crate::connectors::native::NativeConnector;
use crate::connectors::process::{ExternalProcessConnector, MAX_OUTPUT_BYTES, ProcessConfig};
use crate::consts::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_MS};
use crate::events::{Event, EventBus};
use crate::gateway::GatewayConfig;
use crate::registry::ConnectorRegistry;

/// How to build one connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectorKind {
    Native,
    Language {
        language: Language,
    },
    Process {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        working_dir: Option<PathBuf>,
        #[serde(default = "default_max_output_bytes")]
        max_output_bytes: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorEntry {
    pub name: String,
    #[serde(flatten)]
    pub kind: ConnectorKind,
}

impl ConnectorEntry {
    pub fn build(&self, events: &EventBus) -> Arc<dyn Connector> {
        match &self.kind {
            ConnectorKind::Native => Arc::new(NativeConnector::new(&self.name, events.clone())),
            ConnectorKind::Language { language } => Arc::new(LanguageConnector::new(
                *language,
                &self.name,
                events.clone(),
            )),
            ConnectorKind::Process {
                program,
                args,
                working_dir,
                max_output_bytes,
            } => Arc::new(ExternalProcessConnector::new(
                &self.name,
                ProcessConfig {
                    program: program.clone(),
                    args: args.clone(),
                    working_dir: working_dir.clone(),
                    max_output_bytes: *max_output_bytes,
                },
                events.clone(),
            )),
        }
    }

    fn label(&self) -> String {
        match &self.kind {
            ConnectorKind::Native => "native".to_string(),
            ConnectorKind::Language { language } => format!("language:{}", language.id()),
            ConnectorKind::Process { program, .. } => format!("process:{program}"),
        }
    }
}

fn default_connect_timeout_secs() -> Option<u64> {
    Some(DEFAULT_CONNECT_TIMEOUT_SECS)
}

fn default_max_output_bytes() -> usize {
    MAX_OUTPUT_BYTES
}

fn default_max_attempts() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

/// `native` plus one stub per language binding, each named by its id.
pub fn default_connectors() -> Vec<ConnectorEntry> {
    std::iter::once(ConnectorEntry {
        name: "native".to_string(),
        kind: ConnectorKind::Native,
    })
    .chain(Language::ALL.iter().map(|&language| ConnectorEntry {
        name: language.id().to_string(),
        kind: ConnectorKind::Language { language },
    }))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// `null` or `0` disables the timeout.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_connectors")]
    pub connectors: Vec<ConnectorEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            connectors: default_connectors(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            connect_timeout: self
                .connect_timeout_secs
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
            max_attempts: self.max_attempts.max(1),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// Build every configured connector. A duplicate name aborts startup.
    pub fn build_registry(&self, events: &EventBus) -> Result<ConnectorRegistry> {
        let mut registry = ConnectorRegistry::new();
        for entry in &self.connectors {
            registry
                .register(entry.name.clone(), entry.build(events))
                .context("invalid connector list")?;
            events.emit(Event::Registered {
                name: entry.name.clone(),
                kind: entry.label(),
            });
        }
        Ok(registry)
    }
}
