//! Tagpick Web API
//!
//! OData and full-text search transport for the `tagpick-core` backend
//! traits. One [`WebApiClient`] implements metadata resolution, candidate
//! fetches, full-text search, and relationship mutations against a remote
//! record store.
//!
//! ## Features
//!
//! - **Data endpoint**: record lists, related-record walks, and `$ref`
//!   relationship mutations with the store's OData v4 protocol headers
//! - **Search endpoint**: structured query requests and double-encoded
//!   response envelopes, mapped to record refs via the primary label field
//! - **Metadata endpoint**: entity definitions resolved by logical name
//! - **Typed errors**: status-code mapping with messages extracted from
//!   OData error bodies
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tagpick_core::{PickerConfig, PickerSession};
//! use tagpick_webapi::{WebApiClient, WebApiConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WebApiConfig::new("https://org.example.com")?;
//! let client = Arc::new(WebApiClient::new(config)?);
//!
//! let picker = PickerConfig::new("account", "a1b2", "account_contacts", "contact");
//! let (mut session, _events) = PickerSession::new(client, picker)?;
//! session.refresh().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

// Re-export main types
pub use client::WebApiClient;
pub use config::{WebApiConfig, DEFAULT_DATA_PATH, DEFAULT_SEARCH_PATH};
pub use error::{WebApiError, WebApiResult};
pub use types::{
    strip_highlight_markers, EntityDefinition, ODataList, ODataRef, SearchDoc, SearchEntity,
    SearchEnvelope, SearchOptions, SearchPayload, SearchRequest,
};
