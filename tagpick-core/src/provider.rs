//! Search providers: local filtering or remote full-text delegation
//!
//! Two variants behind one two-method surface. `Simple` fetches the
//! candidate set once and filters it locally; `Advanced` keeps the same
//! local fetch for the default view and delegates typed queries to the
//! remote full-text endpoint. Which one a session gets is decided purely by
//! [`ProviderConfig::mode`] through [`build_provider`].

use crate::backend::{FullTextSearch, RecordSource};
use crate::config::{ProviderConfig, SearchMode};
use crate::error::PickerResult;
use crate::types::{EntityMetadata, RecordRef, SearchHits};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Fetches all candidates once and answers queries from the cached snapshot
#[derive(Debug)]
pub struct SimpleProvider<B> {
    backend: Arc<B>,
    target: EntityMetadata,
    config: ProviderConfig,
    cache: OnceCell<Vec<RecordRef>>,
}

impl<B: RecordSource> SimpleProvider<B> {
    pub fn new(backend: Arc<B>, target: EntityMetadata, config: ProviderConfig) -> Self {
        Self {
            backend,
            target,
            config,
            cache: OnceCell::new(),
        }
    }

    /// The cached candidate set, fetched on first use
    async fn cached(&self) -> PickerResult<&[RecordRef]> {
        let records = self
            .cache
            .get_or_try_init(|| async {
                self.backend
                    .fetch_records(
                        &self.target,
                        self.config.filter.as_deref(),
                        self.config.order.as_deref(),
                    )
                    .await
            })
            .await?;
        Ok(records.as_slice())
    }

    pub async fn initial_results(&self) -> PickerResult<SearchHits> {
        let records = self.cached().await?;
        Ok(SearchHits::from_records(records.to_vec()))
    }

    /// Case-insensitive substring match against the cached labels
    ///
    /// Stateless across calls: always filters the same cached snapshot. An
    /// empty query returns the full set.
    pub async fn search(&self, query: &str) -> PickerResult<SearchHits> {
        let records = self.cached().await?;
        let needle = query.to_lowercase();
        let matched: Vec<RecordRef> = records
            .iter()
            .filter(|r| r.label.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        debug!(
            query,
            matched = matched.len(),
            of = records.len(),
            "local filter"
        );
        Ok(SearchHits::from_records(matched))
    }
}

/// Delegates typed queries to the remote full-text endpoint
///
/// The default view still comes from the local fetch, so showing the widget
/// costs no round-trip to the search service.
#[derive(Debug)]
pub struct AdvancedProvider<B> {
    local: SimpleProvider<B>,
}

impl<B: RecordSource + FullTextSearch> AdvancedProvider<B> {
    pub fn new(backend: Arc<B>, target: EntityMetadata, config: ProviderConfig) -> Self {
        Self {
            local: SimpleProvider::new(backend, target, config),
        }
    }

    pub async fn initial_results(&self) -> PickerResult<SearchHits> {
        self.local.initial_results().await
    }

    pub async fn search(&self, query: &str) -> PickerResult<SearchHits> {
        let hits = self
            .local
            .backend
            .full_text_search(&self.local.target, query, &self.local.config)
            .await?;
        debug!(query, matched = hits.records.len(), "remote search");
        Ok(hits)
    }
}

/// A provider variant chosen by configuration
#[derive(Debug)]
pub enum SearchProvider<B> {
    Simple(SimpleProvider<B>),
    Advanced(AdvancedProvider<B>),
}

impl<B: RecordSource + FullTextSearch> SearchProvider<B> {
    /// Candidate records for the default (untyped) view
    pub async fn initial_results(&self) -> PickerResult<SearchHits> {
        match self {
            Self::Simple(provider) => provider.initial_results().await,
            Self::Advanced(provider) => provider.initial_results().await,
        }
    }

    /// Candidate records matching `query`
    pub async fn search(&self, query: &str) -> PickerResult<SearchHits> {
        match self {
            Self::Simple(provider) => provider.search(query).await,
            Self::Advanced(provider) => provider.search(query).await,
        }
    }

    /// Which variant this is
    pub fn mode(&self) -> SearchMode {
        match self {
            Self::Simple(_) => SearchMode::Simple,
            Self::Advanced(_) => SearchMode::Advanced,
        }
    }
}

/// Construct the provider variant named by `config.mode`
pub fn build_provider<B: RecordSource + FullTextSearch>(
    backend: Arc<B>,
    target: EntityMetadata,
    config: ProviderConfig,
) -> SearchProvider<B> {
    match config.mode {
        SearchMode::Simple => SearchProvider::Simple(SimpleProvider::new(backend, target, config)),
        SearchMode::Advanced => {
            SearchProvider::Advanced(AdvancedProvider::new(backend, target, config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBackend;

    fn target() -> EntityMetadata {
        EntityMetadata {
            logical_name: "contact".to_string(),
            primary_label_field: "fullname".to_string(),
            display_name: "Contact".to_string(),
            collection_name: "Contacts".to_string(),
            storage_set_name: "contacts".to_string(),
        }
    }

    fn backend() -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend::new(
            target(),
            [("1", "Alpha"), ("2", "Beta")],
        ))
    }

    #[tokio::test]
    async fn simple_search_is_case_insensitive() {
        let provider = SimpleProvider::new(backend(), target(), ProviderConfig::default());

        let hits = provider.search("al").await.unwrap();
        let labels: Vec<&str> = hits.records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Alpha"]);

        let all = provider.search("").await.unwrap();
        assert_eq!(all.records.len(), 2);
        assert_eq!(all.total, Some(2));
    }

    #[tokio::test]
    async fn simple_fetches_once_and_reuses_the_snapshot() {
        let backend = backend();
        let provider = SimpleProvider::new(backend.clone(), target(), ProviderConfig::default());

        provider.initial_results().await.unwrap();
        provider.search("a").await.unwrap();
        provider.search("b").await.unwrap();

        assert_eq!(backend.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn advanced_default_view_skips_the_search_service() {
        let backend = backend();
        let provider = AdvancedProvider::new(backend.clone(), target(), ProviderConfig::default());

        let hits = provider.initial_results().await.unwrap();
        assert_eq!(hits.records.len(), 2);
        assert_eq!(backend.search_calls(), 0);
        assert_eq!(backend.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn advanced_search_delegates_to_the_service() {
        let backend = backend();
        let provider = AdvancedProvider::new(backend.clone(), target(), ProviderConfig::default());

        let hits = provider.search("Alpha").await.unwrap();
        assert_eq!(hits.records.len(), 1);
        assert_eq!(backend.search_calls(), 1);
        assert_eq!(backend.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn factory_is_keyed_by_mode() {
        let simple = build_provider(backend(), target(), ProviderConfig::default());
        assert_eq!(simple.mode(), SearchMode::Simple);

        let advanced = build_provider(
            backend(),
            target(),
            ProviderConfig::new(SearchMode::Advanced),
        );
        assert_eq!(advanced.mode(), SearchMode::Advanced);
    }
}
