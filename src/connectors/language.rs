//! Stub connectors for foreign language bindings.
//!
//! Each binding is one [`LanguageConnector`] value; which one handles a
//! request is decided by the registry name, not by per-language dispatch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Connector, Link, reject_blank_endpoints};
use crate::events::{Event, EventBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Swift,
    Java,
    Cpp,
    Mojo,
    Python,
    Go,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Swift,
        Language::Java,
        Language::Cpp,
        Language::Mojo,
        Language::Python,
        Language::Go,
    ];

    /// Lowercase identifier, also the default registry name.
    pub fn id(self) -> &'static str {
        match self {
            Language::Swift => "swift",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::Mojo => "mojo",
            Language::Python => "python",
            Language::Go => "go",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::Swift => "Swift",
            Language::Java => "Java",
            Language::Cpp => "C++",
            Language::Mojo => "Mojo",
            Language::Python => "Python",
            Language::Go => "Go",
        }
    }
}

pub struct LanguageConnector {
    language: Language,
    name: String,
    events: EventBus,
}

impl LanguageConnector {
    pub fn new(language: Language, name: impl Into<String>, events: EventBus) -> Self {
        Self {
            language,
            name: name.into(),
            events,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

#[async_trait]
impl Connector for LanguageConnector {
    fn kind(&self) -> &str {
        self.language.display_name()
    }

    async fn connect(&self, source: &str, destination: &str) -> Link {
        if let Some(rejected) = reject_blank_endpoints(source, destination) {
            return rejected;
        }
        tracing::debug!(
            language = self.language.id(),
            source,
            destination,
            "processing connection request"
        );
        Link::connected()
            .with("source_type", self.language.id())
            .with(
                "technologies",
                format!("{},{}", self.language.display_name(), destination),
            )
    }

    async fn process_data(&self, payload: &str) {
        if payload.is_empty() {
            self.events.emit(Event::DataDropped {
                connector: self.name.clone(),
                reason: "empty payload".to_string(),
            });
            return;
        }
        tracing::debug!(language = self.language.id(), payload, "processing data");
        self.events.emit(Event::DataTransfer {
            connector: self.name.clone(),
            bytes: payload.len(),
        });
    }
}
