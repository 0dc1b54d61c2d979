//! Trait seams between the picker core and the remote store
//!
//! Everything the core needs from the outside world goes through these four
//! traits: metadata resolution, candidate fetches, full-text search, and the
//! relationship mutations themselves. `tagpick-webapi` implements all of
//! them over HTTP; `testing::MemoryBackend` implements them in memory so the
//! state machine is testable without a network.

use crate::config::ProviderConfig;
use crate::error::PickerResult;
use crate::types::{EntityMetadata, RecordId, RecordRef, SearchHits};
use async_trait::async_trait;

/// Resolves a record type's metadata by logical name
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Look up the primary label field, display names, and storage set name
    async fn resolve(&self, type_name: &str) -> PickerResult<EntityMetadata>;
}

/// Fetches candidate records of a type
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch all records of the type, honoring a static filter and sort order
    async fn fetch_records(
        &self,
        target: &EntityMetadata,
        filter: Option<&str>,
        order: Option<&str>,
    ) -> PickerResult<Vec<RecordRef>>;
}

/// Delegates a query to the remote full-text search endpoint
#[async_trait]
pub trait FullTextSearch: Send + Sync {
    /// Run `query` against the type, applying the provider's static filter,
    /// column restriction, match mode, best-effort flag, and sort order.
    /// An empty query is valid and returns the service's default result set.
    async fn full_text_search(
        &self,
        target: &EntityMetadata,
        query: &str,
        provider: &ProviderConfig,
    ) -> PickerResult<SearchHits>;
}

/// Creates, deletes, and lists relationship records between a host record
/// and its targets
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Create the relationship record for (host, target)
    async fn associate(
        &self,
        host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        target: &EntityMetadata,
        target_id: &RecordId,
    ) -> PickerResult<()>;

    /// Delete the relationship record for (host, target)
    async fn disassociate(
        &self,
        host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        target_id: &RecordId,
    ) -> PickerResult<()>;

    /// List the records currently related to the host through `relationship`
    async fn load_related(
        &self,
        host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        target: &EntityMetadata,
    ) -> PickerResult<Vec<RecordRef>>;
}

/// Umbrella trait for a backend that provides every seam the session needs
pub trait StoreBackend: MetadataResolver + RecordSource + FullTextSearch + RelationshipStore {}

impl<T> StoreBackend for T where
    T: MetadataResolver + RecordSource + FullTextSearch + RelationshipStore
{
}
