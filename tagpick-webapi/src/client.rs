//! HTTP client for the record store's data and search endpoints
//!
//! One `WebApiClient` serves all four backend traits from `tagpick-core`:
//! metadata resolution, candidate fetches, full-text search, and
//! relationship mutations. URLs and headers follow the store's OData v4
//! surface; see the type-level docs in [`crate::types`] for the wire shapes.

use crate::config::WebApiConfig;
use crate::error::{WebApiError, WebApiResult};
use crate::types::{
    EntityDefinition, ODataList, ODataRef, SearchEntity, SearchEnvelope, SearchOptions,
    SearchPayload, SearchRequest,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tagpick_core::{
    EntityMetadata, FullTextSearch, MetadataResolver, PickerError, PickerResult, ProviderConfig,
    RecordId, RecordRef, RecordSource, RelationshipStore, SearchHits,
};
use tracing::{debug, instrument, warn};

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
const ODATA_VERSION: &str = "4.0";

const METADATA_SELECT: &str =
    "PrimaryNameAttribute,DisplayCollectionName,DisplayName,EntitySetName";

/// Extract a human-readable message from an OData error body
///
/// Tries the nested `error.message`, then a top-level `Message`, then falls
/// back to the raw body.
fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
        if let Some(message) = json.get("Message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    body.to_string()
}

/// Client for the store's OData data endpoint and search endpoint
#[derive(Debug, Clone)]
pub struct WebApiClient {
    client: Client,
    config: WebApiConfig,
}

impl WebApiClient {
    /// Build a client with the store's standard protocol headers
    pub fn new(config: WebApiConfig) -> WebApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("OData-MaxVersion", HeaderValue::from_static(ODATA_VERSION));
        headers.insert("OData-Version", HeaderValue::from_static(ODATA_VERSION));

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &WebApiConfig {
        &self.config
    }

    /// Map an HTTP response to a `WebApiError` based on status code
    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> WebApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);

        match status_code {
            401 => Err(WebApiError::Unauthorized(message)),
            403 => Err(WebApiError::Forbidden(message)),
            404 => Err(WebApiError::NotFound(message)),
            409 => Err(WebApiError::Conflict(message)),
            _ => Err(WebApiError::Api {
                status: status_code,
                body: message,
            }),
        }
    }

    /// The `$select` list for record rows: primary label plus id attribute
    fn row_select(target: &EntityMetadata) -> String {
        format!("{},{}", target.primary_label_field, target.id_attribute())
    }

    /// Turn a raw row into a record ref, skipping rows missing either field
    fn rows_to_records(rows: Vec<serde_json::Value>, target: &EntityMetadata) -> Vec<RecordRef> {
        let id_attribute = target.id_attribute();
        rows.into_iter()
            .filter_map(|row| {
                let id = row.get(&id_attribute).and_then(|v| v.as_str());
                let label = row
                    .get(&target.primary_label_field)
                    .and_then(|v| v.as_str());
                match (id, label) {
                    (Some(id), Some(label)) => Some(RecordRef::new(id, label)),
                    _ => {
                        debug!(?row, "row missing id or label, skipped");
                        None
                    }
                }
            })
            .collect()
    }

    /// Fetch the entity definition for a logical type name
    pub async fn entity_definition(&self, logical_name: &str) -> WebApiResult<EntityDefinition> {
        let url = self
            .config
            .data_url(&format!("EntityDefinitions(LogicalName='{logical_name}')"));
        let response = self
            .client
            .get(&url)
            .query(&[("$select", METADATA_SELECT)])
            .send()
            .await?;
        let response = self.check_response(response).await?;
        let definition = response.json().await?;
        Ok(definition)
    }

    /// List records of the target type, honoring a static filter and order
    pub async fn list_records(
        &self,
        target: &EntityMetadata,
        filter: Option<&str>,
        order: Option<&str>,
    ) -> WebApiResult<Vec<RecordRef>> {
        let url = self.config.data_url(&target.storage_set_name);
        let mut query: Vec<(&str, String)> = vec![("$select", Self::row_select(target))];
        if let Some(filter) = filter {
            query.push(("$filter", filter.to_string()));
        }
        if let Some(order) = order {
            query.push(("$orderby", order.to_string()));
        }

        let response = self.client.get(&url).query(&query).send().await?;
        let response = self.check_response(response).await?;
        let list: ODataList<serde_json::Value> = response.json().await?;
        Ok(Self::rows_to_records(list.value, target))
    }

    /// List the target records currently related to a host record
    pub async fn related_records(
        &self,
        host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        target: &EntityMetadata,
    ) -> WebApiResult<Vec<RecordRef>> {
        let url = self.config.data_url(&format!(
            "{}({})/{}",
            host.storage_set_name, host_id, relationship
        ));
        let response = self
            .client
            .get(&url)
            .query(&[("$select", Self::row_select(target))])
            .send()
            .await?;
        let response = self.check_response(response).await?;
        let list: ODataList<serde_json::Value> = response.json().await?;
        Ok(Self::rows_to_records(list.value, target))
    }

    /// Create a relationship reference between a target record and the host
    ///
    /// Addressed from the target side: the reference collection of the
    /// target record gains a pointer to the host record.
    pub async fn create_ref(
        &self,
        host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        target: &EntityMetadata,
        target_id: &RecordId,
    ) -> WebApiResult<()> {
        let url = self.config.data_url(&format!(
            "{}({})/{}/$ref",
            target.storage_set_name, target_id, relationship
        ));
        let body = ODataRef {
            odata_id: self
                .config
                .data_url(&format!("{}({})", host.storage_set_name, host_id)),
        };

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .json(&body)
            .send()
            .await?;
        self.check_response(response).await?;
        Ok(())
    }

    /// Delete the relationship reference between the host and a target record
    pub async fn delete_ref(
        &self,
        host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        target_id: &RecordId,
    ) -> WebApiResult<()> {
        let url = self.config.data_url(&format!(
            "{}({})/{}({})/$ref",
            host.storage_set_name, host_id, relationship, target_id
        ));
        let response = self
            .client
            .delete(&url)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .send()
            .await?;
        self.check_response(response).await?;
        Ok(())
    }

    /// Run a full-text query against the search endpoint
    ///
    /// The result envelope carries a JSON-encoded payload; both stages are
    /// decoded here and mapped to record refs through the target's primary
    /// label field.
    #[instrument(skip(self, target, provider), fields(entity = %target.logical_name))]
    pub async fn search(
        &self,
        target: &EntityMetadata,
        query: &str,
        provider: &ProviderConfig,
    ) -> WebApiResult<SearchHits> {
        let request = SearchRequest {
            search: query.to_string(),
            entities: vec![SearchEntity {
                name: target.logical_name.clone(),
                filter: provider.filter.clone(),
                search_columns: if provider.search_columns.is_empty() {
                    None
                } else {
                    Some(provider.search_columns.clone())
                },
            }],
            options: SearchOptions {
                best_effort_search_enabled: provider.best_effort,
                search_mode: provider.match_words,
            },
            orderby: provider.order.clone().map(|order| vec![order]),
            count: true,
        };

        let response = self
            .client
            .post(self.config.search_url())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .json(&request)
            .send()
            .await?;
        let response = self.check_response(response).await?;
        let envelope: SearchEnvelope = response.json().await?;
        let payload: SearchPayload = serde_json::from_str(&envelope.response)
            .map_err(|e| WebApiError::UnexpectedResponse(format!("search payload: {e}")))?;

        let records: Vec<RecordRef> = payload
            .value
            .iter()
            .filter_map(|doc| {
                let label = doc.label(&target.primary_label_field);
                if label.is_none() {
                    warn!(id = %doc.id, "search document without a label, skipped");
                }
                Some(RecordRef::new(doc.id.clone(), label?))
            })
            .collect();
        let total = payload.count.and_then(|count| u64::try_from(count).ok());
        debug!(matched = records.len(), ?total, "search decoded");
        Ok(SearchHits::new(records, total))
    }
}

#[async_trait]
impl MetadataResolver for WebApiClient {
    async fn resolve(&self, type_name: &str) -> PickerResult<EntityMetadata> {
        let definition = self.entity_definition(type_name).await.map_err(|e| {
            PickerError::MetadataUnresolved {
                entity: type_name.to_string(),
                source: Box::new(e),
            }
        })?;
        Ok(EntityMetadata {
            logical_name: type_name.to_string(),
            primary_label_field: definition.primary_name_attribute,
            display_name: definition.display_name,
            collection_name: definition.display_collection_name,
            storage_set_name: definition.entity_set_name,
        })
    }
}

#[async_trait]
impl RecordSource for WebApiClient {
    async fn fetch_records(
        &self,
        target: &EntityMetadata,
        filter: Option<&str>,
        order: Option<&str>,
    ) -> PickerResult<Vec<RecordRef>> {
        self.list_records(target, filter, order)
            .await
            .map_err(|e| PickerError::backend("fetch_records", e))
    }
}

#[async_trait]
impl FullTextSearch for WebApiClient {
    async fn full_text_search(
        &self,
        target: &EntityMetadata,
        query: &str,
        provider: &ProviderConfig,
    ) -> PickerResult<SearchHits> {
        self.search(target, query, provider)
            .await
            .map_err(|e| PickerError::backend("full_text_search", e))
    }
}

#[async_trait]
impl RelationshipStore for WebApiClient {
    async fn associate(
        &self,
        host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        target: &EntityMetadata,
        target_id: &RecordId,
    ) -> PickerResult<()> {
        self.create_ref(host, host_id, relationship, target, target_id)
            .await
            .map_err(|e| PickerError::backend("associate", e))
    }

    async fn disassociate(
        &self,
        host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        target_id: &RecordId,
    ) -> PickerResult<()> {
        self.delete_ref(host, host_id, relationship, target_id)
            .await
            .map_err(|e| PickerError::backend("disassociate", e))
    }

    async fn load_related(
        &self,
        host: &EntityMetadata,
        host_id: &RecordId,
        relationship: &str,
        target: &EntityMetadata,
    ) -> PickerResult<Vec<RecordRef>> {
        self.related_records(host, host_id, relationship, target)
            .await
            .map_err(|e| PickerError::backend("load_related", e))
    }
}
