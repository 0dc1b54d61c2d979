//! Wire types for the data and search endpoints
//!
//! The search endpoint double-encodes its result: the HTTP body is a JSON
//! envelope whose `response` field is itself a JSON document. [`SearchEnvelope`]
//! holds the first stage, [`SearchPayload`] the second.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tagpick_core::MatchWords;

/// A list response from the data endpoint: `{"value": [...]}`
#[derive(Debug, Deserialize)]
pub struct ODataList<T> {
    pub value: Vec<T>,
}

/// Entity definition from the metadata endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityDefinition {
    pub primary_name_attribute: String,
    pub display_name: String,
    pub display_collection_name: String,
    pub entity_set_name: String,
}

/// Body of an associate request: a reference to the host record
#[derive(Debug, Serialize)]
pub struct ODataRef {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

/// One entity scope in a search request
#[derive(Debug, Clone, Serialize)]
pub struct SearchEntity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(rename = "searchColumns", skip_serializing_if = "Option::is_none")]
    pub search_columns: Option<Vec<String>>,
}

/// Options block of a search request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub best_effort_search_enabled: bool,
    pub search_mode: MatchWords,
}

/// Request body for the full-text search endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub search: String,
    pub entities: Vec<SearchEntity>,
    pub options: SearchOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderby: Option<Vec<String>>,
    pub count: bool,
}

/// First decoding stage of a search response
#[derive(Debug, Deserialize)]
pub struct SearchEnvelope {
    pub response: String,
}

/// Second decoding stage: the actual result set
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchPayload {
    #[serde(default)]
    pub value: Vec<SearchDoc>,
    #[serde(default)]
    pub count: Option<i64>,
}

/// One matched document in a search payload
///
/// Depending on the service's response shape a document carries the selected
/// attributes, highlight fragments, or both.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchDoc {
    pub id: String,
    #[serde(default)]
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub highlights: Option<HashMap<String, Vec<String>>>,
}

impl SearchDoc {
    /// The document's display label
    ///
    /// Prefers the primary attribute; falls back to the first highlight
    /// fragment with the emphasis markers removed.
    pub fn label(&self, primary: &str) -> Option<String> {
        if let Some(attributes) = &self.attributes {
            if let Some(value) = attributes.get(primary).and_then(|v| v.as_str()) {
                return Some(value.to_string());
            }
        }
        self.highlights
            .as_ref()
            .and_then(|highlights| highlights.get(primary))
            .and_then(|fragments| fragments.first())
            .map(|fragment| strip_highlight_markers(fragment))
    }
}

/// Remove the `<em>` markers the search service wraps matches in
pub fn strip_highlight_markers(fragment: &str) -> String {
    fragment.replace("<em>", "").replace("</em>", "")
}
