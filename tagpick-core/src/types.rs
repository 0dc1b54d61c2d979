//! Core types: record references, selections, candidate indexes

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque identifier of a record in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a raw id as received from the store
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A target record identified by its id and primary display label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: RecordId,
    pub label: String,
}

impl RecordRef {
    pub fn new(id: impl Into<RecordId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Resolved metadata for a record type
///
/// Produced by a `MetadataResolver` before any provider is constructed;
/// everything downstream (label fields, storage set paths) reads from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Logical name of the record type, as configured
    pub logical_name: String,
    /// Attribute holding the record's human-readable label
    pub primary_label_field: String,
    /// Singular display name
    pub display_name: String,
    /// Plural display name
    pub collection_name: String,
    /// Storage set name used in data URLs
    pub storage_set_name: String,
}

impl EntityMetadata {
    /// Attribute holding the record's id, derived from the logical name
    pub fn id_attribute(&self) -> String {
        format!("{}id", self.logical_name)
    }
}

/// The committed selection: labels currently associated with the host record
///
/// Each label keeps the `RecordRef` it was resolved to when it entered the
/// selection, so removals never depend on the candidate index of the moment.
/// Membership is by label; insertion order is not significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    records: Vec<RecordRef>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from known records, keeping the last ref per label
    pub fn from_records(records: impl IntoIterator<Item = RecordRef>) -> Self {
        let mut selection = Self::new();
        for record in records {
            selection.insert(record);
        }
        selection
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.records.iter().any(|r| r.label == label)
    }

    pub fn get(&self, label: &str) -> Option<&RecordRef> {
        self.records.iter().find(|r| r.label == label)
    }

    /// Insert a record, replacing any existing entry with the same label
    pub fn insert(&mut self, record: RecordRef) {
        self.records.retain(|r| r.label != record.label);
        self.records.push(record);
    }

    /// Remove the entry for `label`, returning it if present
    pub fn remove(&mut self, label: &str) -> Option<RecordRef> {
        let position = self.records.iter().position(|r| r.label == label)?;
        Some(self.records.remove(position))
    }

    pub fn records(&self) -> &[RecordRef] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordRef> {
        self.records.iter()
    }

    /// The selection's labels as a set
    pub fn labels(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.label.clone()).collect()
    }
}

impl FromIterator<RecordRef> for Selection {
    fn from_iter<T: IntoIterator<Item = RecordRef>>(iter: T) -> Self {
        Self::from_records(iter)
    }
}

/// The most recent candidate list known to the UI
///
/// Snapshots come from `initial_results` or `search`; additions to the
/// selection are resolved against this snapshot by label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateIndex {
    records: Vec<RecordRef>,
}

impl CandidateIndex {
    pub fn new(records: Vec<RecordRef>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[RecordRef] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolve a label to its record, exact match
    pub fn resolve(&self, label: &str) -> Option<&RecordRef> {
        self.records.iter().find(|r| r.label == label)
    }
}

impl From<Vec<RecordRef>> for CandidateIndex {
    fn from(records: Vec<RecordRef>) -> Self {
        Self::new(records)
    }
}

/// Records returned by a provider call, with the total match count when the
/// backend reports one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    pub records: Vec<RecordRef>,
    pub total: Option<u64>,
}

impl SearchHits {
    pub fn new(records: Vec<RecordRef>, total: Option<u64>) -> Self {
        Self { records, total }
    }

    /// Hits where the total is simply the number of records returned
    pub fn from_records(records: Vec<RecordRef>) -> Self {
        let total = Some(records.len() as u64);
        Self { records, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, label: &str) -> RecordRef {
        RecordRef::new(id, label)
    }

    #[test]
    fn selection_membership_is_by_label() {
        let mut selection = Selection::from_records([record("1", "Alpha")]);
        assert!(selection.contains("Alpha"));
        assert!(!selection.contains("alpha"));

        selection.insert(record("2", "Alpha"));
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.get("Alpha").map(|r| r.id.as_str()), Some("2"));
    }

    #[test]
    fn selection_remove_returns_the_known_ref() {
        let mut selection = Selection::from_records([record("1", "Alpha"), record("2", "Beta")]);
        let removed = selection.remove("Beta");
        assert_eq!(removed, Some(record("2", "Beta")));
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.remove("Beta"), None);
    }

    #[test]
    fn candidate_index_resolves_exact_labels() {
        let index = CandidateIndex::new(vec![record("1", "Alpha"), record("2", "Beta")]);
        assert_eq!(index.resolve("Beta").map(|r| r.id.as_str()), Some("2"));
        assert_eq!(index.resolve("beta"), None);
        assert_eq!(index.resolve("Gamma"), None);
    }

    #[test]
    fn id_attribute_derives_from_logical_name() {
        let metadata = EntityMetadata {
            logical_name: "account".to_string(),
            primary_label_field: "name".to_string(),
            display_name: "Account".to_string(),
            collection_name: "Accounts".to_string(),
            storage_set_name: "accounts".to_string(),
        };
        assert_eq!(metadata.id_attribute(), "accountid");
    }
}
