//! Picker and provider configuration

use crate::debounce::DEFAULT_DEBOUNCE_MS;
use crate::error::{PickerError, PickerResult};
use crate::types::RecordId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which provider variant serves search requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Fetch once, filter locally
    #[default]
    Simple,
    /// Delegate queries to the remote full-text search endpoint
    Advanced,
}

/// Term-combination mode for the remote full-text search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchWords {
    /// Every term must match
    #[default]
    All,
    /// Any single term may match
    Any,
}

/// Where the host renders the widget label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelLocation {
    #[default]
    Above,
    Left,
}

/// Provider settings, fixed for the lifetime of a provider instance
///
/// Changing any of these means building a new provider through the factory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider variant to construct
    pub mode: SearchMode,
    /// Static filter expression applied to every fetch and search
    #[serde(default)]
    pub filter: Option<String>,
    /// Static sort expression
    #[serde(default)]
    pub order: Option<String>,
    /// Columns the remote search may match against; empty means service default
    #[serde(default)]
    pub search_columns: Vec<String>,
    /// Term-combination mode for remote search
    #[serde(default)]
    pub match_words: MatchWords,
    /// Let the remote search relax matching when exact results are thin
    #[serde(default)]
    pub best_effort: bool,
}

impl ProviderConfig {
    pub fn new(mode: SearchMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn with_search_columns(mut self, columns: impl IntoIterator<Item = String>) -> Self {
        self.search_columns = columns.into_iter().collect();
        self
    }

    pub fn with_match_words(mut self, match_words: MatchWords) -> Self {
        self.match_words = match_words;
        self
    }

    pub fn with_best_effort(mut self, best_effort: bool) -> Self {
        self.best_effort = best_effort;
        self
    }
}

/// Everything a picker session needs to know at construction
///
/// Identifies the host record, the relationship to maintain, and the related
/// record type, plus the flags the host surface consumes verbatim
/// (`allow_add_new`, label placement and width).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerConfig {
    /// Logical name of the host record type
    pub host_type: String,
    /// Id of the host record
    pub host_id: RecordId,
    /// Name of the relationship to maintain
    pub relationship: String,
    /// Logical name of the related record type
    pub target_type: String,
    /// Provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Quiescence window for the query pipeline
    #[serde(default = "default_debounce")]
    pub debounce: Duration,
    /// Whether the host offers a "create new record" affordance
    #[serde(default)]
    pub allow_add_new: bool,
    /// Widget label text, if the host renders one
    #[serde(default)]
    pub label: Option<String>,
    /// Where the host places the label
    #[serde(default)]
    pub label_location: LabelLocation,
    /// Label width, host units
    #[serde(default)]
    pub label_width: Option<String>,
}

fn default_debounce() -> Duration {
    Duration::from_millis(DEFAULT_DEBOUNCE_MS)
}

impl PickerConfig {
    pub fn new(
        host_type: impl Into<String>,
        host_id: impl Into<RecordId>,
        relationship: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        Self {
            host_type: host_type.into(),
            host_id: host_id.into(),
            relationship: relationship.into(),
            target_type: target_type.into(),
            provider: ProviderConfig::default(),
            debounce: default_debounce(),
            allow_add_new: false,
            label: None,
            label_location: LabelLocation::default(),
            label_width: None,
        }
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_allow_add_new(mut self, allow_add_new: bool) -> Self {
        self.allow_add_new = allow_add_new;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_label_location(mut self, location: LabelLocation) -> Self {
        self.label_location = location;
        self
    }

    pub fn with_label_width(mut self, width: impl Into<String>) -> Self {
        self.label_width = Some(width.into());
        self
    }

    /// Check the fields a session cannot function without
    pub fn validate(&self) -> PickerResult<()> {
        if self.host_type.is_empty() {
            return Err(PickerError::Config("host type is empty".to_string()));
        }
        if self.host_id.as_str().is_empty() {
            return Err(PickerError::Config("host record id is empty".to_string()));
        }
        if self.relationship.is_empty() {
            return Err(PickerError::Config("relationship name is empty".to_string()));
        }
        if self.target_type.is_empty() {
            return Err(PickerError::Config("target type is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PickerConfig {
        PickerConfig::new("account", "host-1", "account_contacts", "contact")
    }

    #[test]
    fn defaults_are_simple_and_quiet() {
        let config = config();
        assert_eq!(config.provider.mode, SearchMode::Simple);
        assert_eq!(config.provider.match_words, MatchWords::All);
        assert!(!config.provider.best_effort);
        assert!(config.provider.search_columns.is_empty());
        assert_eq!(config.debounce, Duration::from_millis(400));
        assert!(!config.allow_add_new);
        assert_eq!(config.label_location, LabelLocation::Above);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_identity() {
        let mut bad = config();
        bad.relationship = String::new();
        assert!(matches!(bad.validate(), Err(PickerError::Config(_))));

        let empty_host = PickerConfig::new("account", "", "rel", "contact");
        assert!(matches!(empty_host.validate(), Err(PickerError::Config(_))));
    }

    #[test]
    fn builder_methods_apply() {
        let config = config()
            .with_provider(
                ProviderConfig::new(SearchMode::Advanced)
                    .with_filter("statecode eq 0")
                    .with_search_columns(["fullname".to_string()])
                    .with_match_words(MatchWords::Any)
                    .with_best_effort(true),
            )
            .with_debounce(Duration::from_millis(250))
            .with_allow_add_new(true)
            .with_label("Contacts")
            .with_label_location(LabelLocation::Left)
            .with_label_width("140px");

        assert_eq!(config.provider.mode, SearchMode::Advanced);
        assert_eq!(config.provider.filter.as_deref(), Some("statecode eq 0"));
        assert_eq!(config.provider.match_words, MatchWords::Any);
        assert!(config.provider.best_effort);
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert!(config.allow_add_new);
        assert_eq!(config.label.as_deref(), Some("Contacts"));
        assert_eq!(config.label_width.as_deref(), Some("140px"));
    }

    #[test]
    fn mode_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&SearchMode::Advanced).unwrap(),
            "\"advanced\""
        );
        assert_eq!(serde_json::to_string(&MatchWords::Any).unwrap(), "\"any\"");
        assert_eq!(
            serde_json::to_string(&LabelLocation::Above).unwrap(),
            "\"above\""
        );
    }
}
