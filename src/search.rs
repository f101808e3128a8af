//! Elasticsearch adapter over the REST `_search` endpoint.
//!
//! Hits are decoded into [`SearchHit`] at this boundary; the typed document
//! shapes (material and discipline) are read off a hit with the helpers at the
//! bottom of this file.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{from_http, Backend, StoreError};
use crate::models::{DisciplineDescriptor, SearchHit};
use crate::stores::{SearchIndex, StoreResult};

pub const MATERIALS_INDEX: &str = "materials";
pub const DISCIPLINES_INDEX: &str = "disciplines";

const USER_AGENT: &str = concat!("university-accounting/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
}

pub struct ElasticSearchIndex {
    http_client: reqwest::Client,
    base_url: String,
    phrase_size: usize,
}

impl ElasticSearchIndex {
    pub fn new(base_url: &str, phrase_size: usize, timeout: Duration) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::unavailable(Backend::Search, e))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            phrase_size: phrase_size.max(1),
        })
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let response = self
            .http_client
            .get(&self.base_url)
            .send()
            .await
            .map_err(|e| from_http(Backend::Search, e))?;

        if !response.status().is_success() {
            return Err(StoreError::unavailable(
                Backend::Search,
                format!("cluster info returned {}", response.status()),
            ));
        }
        Ok(())
    }

    /// Never asks for fewer hits than a phrase query would, even for a short id list.
    fn terms_query(&self, field: &str, terms: &[i64]) -> Value {
        json!({
            "size": terms.len().max(self.phrase_size),
            "query": { "terms": { field: terms } }
        })
    }

    async fn search(&self, index: &str, body: Value) -> StoreResult<Vec<SearchHit>> {
        let url = format!("{}/{}/_search", self.base_url, index);
        tracing::debug!(url = %url, "Querying Elasticsearch");

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| from_http(Backend::Search, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::unavailable(
                Backend::Search,
                format!("search on '{index}' returned {status}: {error_text}"),
            ));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| StoreError::decode(Backend::Search, e))?;

        Ok(parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                document_id: hit.id,
                source: hit.source,
            })
            .collect())
    }
}

#[async_trait]
impl SearchIndex for ElasticSearchIndex {
    async fn match_phrase(
        &self,
        index: &str,
        field: &str,
        phrase: &str,
    ) -> StoreResult<Vec<SearchHit>> {
        let body = json!({
            "size": self.phrase_size,
            "query": { "match_phrase": { field: phrase } }
        });
        self.search(index, body).await
    }

    async fn match_terms(
        &self,
        index: &str,
        field: &str,
        terms: &[i64],
    ) -> StoreResult<Vec<SearchHit>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        self.search(index, self.terms_query(field, terms)).await
    }
}

/// `material_id` is stored as a string-encoded integer; anything else is
/// treated as absent.
pub fn material_id(hit: &SearchHit) -> Option<i64> {
    hit.source
        .get("material_id")?
        .as_str()?
        .trim()
        .parse()
        .ok()
}

pub fn discipline_descriptor(hit: &SearchHit) -> Result<DisciplineDescriptor, StoreError> {
    let discipline_id = match hit.source.get("discipline_id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        StoreError::decode(
            Backend::Search,
            format!("document {} has no integer discipline_id", hit.document_id),
        )
    })?;

    let name = hit
        .source
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            StoreError::decode(
                Backend::Search,
                format!("document {} has no name", hit.document_id),
            )
        })?
        .to_string();

    let description = match hit.source.get("description") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(StoreError::decode(
                Backend::Search,
                format!(
                    "document {} has non-string description: {other}",
                    hit.document_id
                ),
            ))
        }
    };

    Ok(DisciplineDescriptor {
        discipline_id,
        name,
        description,
    })
}
