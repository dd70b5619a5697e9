//! Document configuration.

use crate::compliance::{ConformanceConfig, ConformanceLevel};
use crate::writer::PdfWriterConfig;
use chrono::{DateTime, Utc};

/// Producer string written to Info and XMP unless overridden.
pub const DEFAULT_PRODUCER: &str = concat!("pdfa_oxide ", env!("CARGO_PKG_VERSION"));

/// Per-document configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Writer settings
    pub writer: PdfWriterConfig,
    /// Severity overrides
    pub conformance: ConformanceConfig,
    /// `Producer` in Info and `pdf:Producer` in XMP
    pub producer: String,
    /// Document title
    pub title: Option<String>,
    /// Creation and modification date; the time of closing when unset
    #[serde(skip)]
    pub creation_date: Option<DateTime<Utc>>,
    /// Level to use when opening a file, instead of the one its XMP claims
    pub forced_level: Option<ConformanceLevel>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            writer: PdfWriterConfig::default(),
            conformance: ConformanceConfig::default(),
            producer: DEFAULT_PRODUCER.to_string(),
            title: None,
            creation_date: None,
            forced_level: None,
        }
    }

    /// Set writer options.
    pub fn with_writer(mut self, writer: PdfWriterConfig) -> Self {
        self.writer = writer;
        self
    }

    /// Set severity overrides.
    pub fn with_conformance(mut self, conformance: ConformanceConfig) -> Self {
        self.conformance = conformance;
        self
    }

    /// Set the producer string.
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = producer.into();
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Fix the creation date; output is then fully reproducible.
    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    /// Force the conformance level of opened documents.
    pub fn with_forced_level(mut self, level: ConformanceLevel) -> Self {
        self.forced_level = Some(level);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{RuleId, Severity};

    #[test]
    fn test_defaults() {
        let config = DocumentConfig::default();
        assert!(config.producer.starts_with("pdfa_oxide "));
        assert!(config.title.is_none());
        assert!(config.forced_level.is_none());
    }

    #[test]
    fn test_json_round_trip_keeps_overrides() {
        let config = DocumentConfig::new()
            .with_title("Annual report")
            .with_forced_level(ConformanceLevel::A2u)
            .with_conformance(
                ConformanceConfig::new().with_severity(RuleId::CatalogShouldContainLang, Severity::Ignore),
            );
        let json = serde_json::to_string(&config).expect("serialize");
        let back: DocumentConfig = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back.title.as_deref(), Some("Annual report"));
        assert_eq!(back.forced_level, Some(ConformanceLevel::A2u));
        assert_eq!(
            back.conformance.severity(ConformanceLevel::A2a, RuleId::CatalogShouldContainLang),
            Severity::Ignore
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let back: DocumentConfig = serde_json::from_str(r#"{"title":"x"}"#).expect("deserialize");
        assert_eq!(back.producer, DEFAULT_PRODUCER);
        assert!(!back.writer.compress);
    }
}
