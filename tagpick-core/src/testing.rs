//! In-memory backend for network-free tests
//!
//! Implements every backend trait over process-local state. Call counters
//! and fault injection let session and provider behavior be asserted
//! without a server.

use crate::backend::{FullTextSearch, MetadataResolver, RecordSource, RelationshipStore};
use crate::config::{MatchWords, ProviderConfig};
use crate::error::{PickerError, PickerResult};
use crate::types::{EntityMetadata, RecordId, RecordRef, SearchHits};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Error returned by injected faults
#[derive(Debug, thiserror::Error)]
#[error("injected fault: {0}")]
pub struct InjectedFault(pub String);

/// The full-text request as the backend saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSearch {
    pub query: String,
    pub match_words: MatchWords,
    pub best_effort: bool,
    pub search_columns: Vec<String>,
    pub filter: Option<String>,
    pub order: Option<String>,
}

/// In-memory store backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entities: Mutex<HashMap<String, EntityMetadata>>,
    corpus: Mutex<Vec<RecordRef>>,
    related: Mutex<HashMap<String, Vec<RecordRef>>>,

    metadata_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    search_calls: AtomicUsize,
    associate_calls: AtomicUsize,
    disassociate_calls: AtomicUsize,

    last_fetch: Mutex<Option<(Option<String>, Option<String>)>>,
    last_search: Mutex<Option<CapturedSearch>>,

    fail_ids: Mutex<HashSet<String>>,
    fail_metadata: AtomicBool,
    fail_search: AtomicBool,
    fail_fetch: AtomicBool,
}

fn related_key(host_id: &RecordId, relationship: &str) -> String {
    format!("{}:{}", host_id, relationship)
}

impl MemoryBackend {
    /// Backend serving `target` with the given candidate corpus
    pub fn new<'a>(
        target: EntityMetadata,
        records: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let backend = Self::default();
        backend
            .entities
            .lock()
            .unwrap()
            .insert(target.logical_name.clone(), target);
        *backend.corpus.lock().unwrap() = records
            .into_iter()
            .map(|(id, label)| RecordRef::new(id, label))
            .collect();
        backend
    }

    /// Register another entity type, typically the host's
    pub fn with_entity(self, metadata: EntityMetadata) -> Self {
        self.entities
            .lock()
            .unwrap()
            .insert(metadata.logical_name.clone(), metadata);
        self
    }

    /// Pre-populate the relationship store for a host record
    pub fn seed_related(
        &self,
        host_id: &RecordId,
        relationship: &str,
        records: impl IntoIterator<Item = RecordRef>,
    ) {
        self.related
            .lock()
            .unwrap()
            .insert(related_key(host_id, relationship), records.into_iter().collect());
    }

    /// Make every mutation touching this target id fail
    pub fn fail_mutations_on(&self, id: impl Into<String>) {
        self.fail_ids.lock().unwrap().insert(id.into());
    }

    /// Toggle metadata resolution failure
    pub fn set_metadata_failing(&self, failing: bool) {
        self.fail_metadata.store(failing, Ordering::SeqCst);
    }

    /// Toggle full-text search failure
    pub fn set_search_failing(&self, failing: bool) {
        self.fail_search.store(failing, Ordering::SeqCst);
    }

    /// Toggle candidate fetch failure
    pub fn set_fetch_failing(&self, failing: bool) {
        self.fail_fetch.store(failing, Ordering::SeqCst);
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn associate_calls(&self) -> usize {
        self.associate_calls.load(Ordering::SeqCst)
    }

    pub fn disassociate_calls(&self) -> usize {
        self.disassociate_calls.load(Ordering::SeqCst)
    }

    /// Filter and order of the most recent candidate fetch
    pub fn last_fetch(&self) -> Option<(Option<String>, Option<String>)> {
        self.last_fetch.lock().unwrap().clone()
    }

    /// The most recent full-text request
    pub fn last_search(&self) -> Option<CapturedSearch> {
        self.last_search.lock().unwrap().clone()
    }

    /// Labels currently related to the host record, sorted
    pub fn related_labels(&self, host_id: &RecordId, relationship: &str) -> Vec<String> {
        let mut labels: Vec<String> = self
            .related
            .lock()
            .unwrap()
            .get(&related_key(host_id, relationship))
            .map(|records| records.iter().map(|r| r.label.clone()).collect())
            .unwrap_or_default();
        labels.sort();
        labels
    }

    fn should_fail(&self, id: &RecordId) -> bool {
        self.fail_ids.lock().unwrap().contains(id.as_str())
    }
}

fn matches_terms(label: &str, query: &str, mode: MatchWords) -> bool {
    let hay = label.to_lowercase();
    let terms: Vec<String> = query.split_whitespace().map(|t| t.to_lowercase()).collect();
    if terms.is_empty() {
        return true;
    }
    match mode {
        MatchWords::All => terms.iter().all(|t| hay.contains(t)),
        MatchWords::Any => terms.iter().any(|t| hay.contains(t)),
    }
}

#[async_trait]
impl MetadataResolver for MemoryBackend {
    async fn resolve(&self, type_name: &str) -> PickerResult<EntityMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(PickerError::MetadataUnresolved {
                entity: type_name.to_string(),
                source: Box::new(InjectedFault("metadata offline".to_string())),
            });
        }
        self.entities
            .lock()
            .unwrap()
            .get(type_name)
            .cloned()
            .ok_or_else(|| PickerError::MetadataUnresolved {
                entity: type_name.to_string(),
                source: Box::new(InjectedFault("unknown entity".to_string())),
            })
    }
}

#[async_trait]
impl RecordSource for MemoryBackend {
    async fn fetch_records(
        &self,
        _target: &EntityMetadata,
        filter: Option<&str>,
        order: Option<&str>,
    ) -> PickerResult<Vec<RecordRef>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(PickerError::backend(
                "fetch_records",
                InjectedFault("fetch offline".to_string()),
            ));
        }
        *self.last_fetch.lock().unwrap() =
            Some((filter.map(String::from), order.map(String::from)));
        Ok(self.corpus.lock().unwrap().clone())
    }
}

#[async_trait]
impl FullTextSearch for MemoryBackend {
    async fn full_text_search(
        &self,
        _target: &EntityMetadata,
        query: &str,
        provider: &ProviderConfig,
    ) -> PickerResult<SearchHits> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(PickerError::backend(
                "full_text_search",
                InjectedFault("search offline".to_string()),
            ));
        }
        *self.last_search.lock().unwrap() = Some(CapturedSearch {
            query: query.to_string(),
            match_words: provider.match_words,
            best_effort: provider.best_effort,
            search_columns: provider.search_columns.clone(),
            filter: provider.filter.clone(),
            order: provider.order.clone(),
        });

        let corpus = self.corpus.lock().unwrap();
        let mut matched: Vec<RecordRef> = corpus
            .iter()
            .filter(|r| matches_terms(&r.label, query, provider.match_words))
            .cloned()
            .collect();
        if matched.is_empty() && provider.best_effort {
            // Relaxed matching: fall back to the whole corpus
            matched = corpus.clone();
        }
        Ok(SearchHits::from_records(matched))
    }
}

#[async_trait]
impl RelationshipStore for MemoryBackend {
    async fn associate(
        &self,
        _host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        _target: &EntityMetadata,
        target_id: &RecordId,
    ) -> PickerResult<()> {
        self.associate_calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(target_id) {
            return Err(PickerError::backend(
                "associate",
                InjectedFault(format!("mutation rejected for {target_id}")),
            ));
        }

        let record = self
            .corpus
            .lock()
            .unwrap()
            .iter()
            .find(|r| &r.id == target_id)
            .cloned()
            .ok_or_else(|| {
                PickerError::backend(
                    "associate",
                    InjectedFault(format!("unknown target {target_id}")),
                )
            })?;

        let mut related = self.related.lock().unwrap();
        let entry = related
            .entry(related_key(host_id, relationship))
            .or_default();
        // One relationship record per (host, target) pair
        if entry.iter().any(|r| &r.id == target_id) {
            return Err(PickerError::backend(
                "associate",
                InjectedFault(format!("duplicate relationship for {target_id}")),
            ));
        }
        entry.push(record);
        Ok(())
    }

    async fn disassociate(
        &self,
        _host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        target_id: &RecordId,
    ) -> PickerResult<()> {
        self.disassociate_calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(target_id) {
            return Err(PickerError::backend(
                "disassociate",
                InjectedFault(format!("mutation rejected for {target_id}")),
            ));
        }

        let mut related = self.related.lock().unwrap();
        let entry = related
            .entry(related_key(host_id, relationship))
            .or_default();
        let before = entry.len();
        entry.retain(|r| &r.id != target_id);
        if entry.len() == before {
            return Err(PickerError::backend(
                "disassociate",
                InjectedFault(format!("no relationship for {target_id}")),
            ));
        }
        Ok(())
    }

    async fn load_related(
        &self,
        _host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        _target: &EntityMetadata,
    ) -> PickerResult<Vec<RecordRef>> {
        Ok(self
            .related
            .lock()
            .unwrap()
            .get(&related_key(host_id, relationship))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> EntityMetadata {
        EntityMetadata {
            logical_name: "contact".to_string(),
            primary_label_field: "fullname".to_string(),
            display_name: "Contact".to_string(),
            collection_name: "Contacts".to_string(),
            storage_set_name: "contacts".to_string(),
        }
    }

    #[tokio::test]
    async fn word_matching_widens_from_all_to_any() {
        let backend = MemoryBackend::new(
            target(),
            [("1", "Acme East"), ("2", "Acme West"), ("3", "Globex East")],
        );

        let all = backend
            .full_text_search(
                &target(),
                "acme east",
                &ProviderConfig::default(),
            )
            .await
            .unwrap();
        assert_eq!(all.records.len(), 1);

        let any_config = ProviderConfig::default().with_match_words(MatchWords::Any);
        let any = backend
            .full_text_search(&target(), "acme east", &any_config)
            .await
            .unwrap();
        assert_eq!(any.records.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_association_is_rejected() {
        let backend = MemoryBackend::new(target(), [("1", "Alpha")]);
        let host_id = RecordId::new("h1");

        backend
            .associate(&target(), &host_id, "rel", &target(), &RecordId::new("1"))
            .await
            .unwrap();
        let second = backend
            .associate(&target(), &host_id, "rel", &target(), &RecordId::new("1"))
            .await;
        assert!(second.is_err());
        assert_eq!(backend.related_labels(&host_id, "rel"), vec!["Alpha"]);
    }
}
