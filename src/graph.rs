//! Neo4j adapter over the HTTP transactional Cypher endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{from_http, Backend, StoreError};
use crate::stores::{GraphStore, StoreResult};

const LESSONS_FOR_MATERIALS: &str = "MATCH (m:Material)-[:MAT_LES]->(l:Lesson) \
     WHERE m.id IN $materialIDs \
     RETURN l.id AS lessonID";

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<CypherError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data: Vec<DataRow>,
}

#[derive(Debug, Deserialize)]
struct DataRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CypherError {
    code: String,
    message: String,
}

pub struct Neo4jGraphStore {
    http_client: reqwest::Client,
    base_url: String,
    commit_url: String,
    user: String,
    password: String,
}

impl Neo4jGraphStore {
    pub fn new(
        base_url: &str,
        database: &str,
        user: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::unavailable(Backend::Graph, e))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let commit_url = format!("{base_url}/db/{database}/tx/commit");

        Ok(Self {
            http_client,
            base_url,
            commit_url,
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let response = self
            .http_client
            .get(&self.base_url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(|e| from_http(Backend::Graph, e))?;

        if !response.status().is_success() {
            return Err(StoreError::unavailable(
                Backend::Graph,
                format!("discovery returned {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn run(&self, statement: &str, parameters: Value) -> StoreResult<Vec<Vec<Value>>> {
        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });

        let response = self
            .http_client
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| from_http(Backend::Graph, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::unavailable(
                Backend::Graph,
                format!("cypher commit returned {status}: {error_text}"),
            ));
        }

        let parsed: CommitResponse = response
            .json()
            .await
            .map_err(|e| StoreError::decode(Backend::Graph, e))?;
        rows_of(parsed)
    }
}

fn rows_of(response: CommitResponse) -> StoreResult<Vec<Vec<Value>>> {
    if let Some(err) = response.errors.first() {
        return Err(StoreError::unavailable(
            Backend::Graph,
            format!("{}: {}", err.code, err.message),
        ));
    }
    Ok(response
        .results
        .into_iter()
        .flat_map(|result| result.data)
        .map(|data| data.row)
        .collect())
}

fn lesson_ids(rows: Vec<Vec<Value>>) -> StoreResult<Vec<i64>> {
    rows.into_iter()
        .map(|row| {
            row.first().and_then(Value::as_i64).ok_or_else(|| {
                StoreError::decode(Backend::Graph, format!("lessonID is not an integer: {row:?}"))
            })
        })
        .collect()
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn lessons_for_materials(&self, material_ids: &[i64]) -> StoreResult<Vec<i64>> {
        if material_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .run(LESSONS_FOR_MATERIALS, json!({ "materialIDs": material_ids }))
            .await?;
        lesson_ids(rows)
    }
}
