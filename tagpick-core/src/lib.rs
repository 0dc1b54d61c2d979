//! Tagpick Core
//!
//! This crate provides the non-visual logic of a multi-select relationship
//! picker: a selection reconciliation engine that turns a desired selection
//! into the minimal set of relationship-store mutations, and a pluggable
//! search-provider abstraction that resolves typed queries into candidate
//! lists, fed by a debounced input pipeline.
//!
//! ## Features
//!
//! - **Selection Reconciliation**: Pure diffing of desired vs. committed
//!   selections with per-label commit outcomes
//! - **Pluggable Providers**: Local filtering over a cached fetch, or
//!   delegation to a remote full-text search endpoint
//! - **Debounced Queries**: Settled values only after a quiescence window,
//!   with cancellation on teardown
//! - **Backend Agnostic**: All store access goes through async traits; an
//!   in-memory backend ships for tests
//! - **Event Stream**: Busy transitions, candidate updates, and commits for
//!   a host surface to render
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tagpick_core::{PickerConfig, PickerResult, PickerSession, StoreBackend};
//!
//! async fn pick<B: StoreBackend + 'static>(backend: Arc<B>) -> PickerResult<()> {
//!     let config = PickerConfig::new("account", "31a9e1a7", "account_contacts", "contact");
//!     let (mut session, _events) = PickerSession::new(backend, config)?;
//!
//!     session.refresh().await?;
//!     session.submit_input("al")?;
//!     session.process_settled().await;
//!
//!     let report = session.set_selection(vec!["Alpha Industries".to_string()]).await?;
//!     assert!(report.all_succeeded());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod debounce;
pub mod error;
pub mod provider;
pub mod reconcile;
pub mod session;
pub mod types;

// Test utilities
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export main types
pub use backend::{
    FullTextSearch, MetadataResolver, RecordSource, RelationshipStore, StoreBackend,
};
pub use config::{LabelLocation, MatchWords, PickerConfig, ProviderConfig, SearchMode};
pub use debounce::{QueryDebouncer, DEFAULT_DEBOUNCE_MS};
pub use error::{PickerError, PickerResult};
pub use provider::{build_provider, SearchProvider};
pub use reconcile::{
    commit_selection, reconcile, CommitReport, MutationKind, MutationOutcome, ReconcilePlan,
};
pub use session::{PickerSession, SessionEvent};
pub use types::{CandidateIndex, EntityMetadata, RecordId, RecordRef, SearchHits, Selection};
