//! Qdrant vector index over the REST API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::types::{FilterSet, IndexedPoint, PointPayload, SearchHit};

use super::vector_store::VectorIndex;

/// Qdrant collection client
pub struct QdrantIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionList {
    collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    points: &'a [IndexedPoint],
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<PointPayload>,
}

/// Translate a filter set into a Qdrant `must` clause
pub fn filter_clause(filters: &FilterSet) -> Option<Value> {
    if filters.is_empty() {
        return None;
    }

    let must: Vec<Value> = filters
        .iter()
        .map(|(key, value)| json!({ "key": key, "match": { "value": value.to_json() } }))
        .collect();

    Some(json!({ "must": must }))
}

impl QdrantIndex {
    /// Create a new Qdrant client
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<reqwest::Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Qdrant {} request failed: {}", action, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "Qdrant {} failed ({}): {}",
                action, status, body
            )));
        }

        Ok(response)
    }

    async fn collection_exists(&self) -> Result<bool> {
        let request = self.client.get(format!("{}/collections", self.base_url));
        let list: QdrantResponse<CollectionList> = self
            .send(request, "list collections")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse collection list: {}", e)))?;

        Ok(list
            .result
            .collections
            .iter()
            .any(|c| c.name == self.collection))
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        if self.collection_exists().await? {
            tracing::info!("Qdrant collection '{}' already exists", self.collection);
            return Ok(());
        }

        let body = json!({ "vectors": { "size": dimensions, "distance": "Cosine" } });
        let response = self
            .authorize(self.client.put(self.collection_url()).json(&body))
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Qdrant create collection request failed: {}", e)))?;

        // Another replica may have created it between the check and the create
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "Qdrant create collection failed ({}): {}",
                status, body
            )));
        }

        tracing::info!(
            "Created Qdrant collection '{}' ({} dims, cosine)",
            self.collection,
            dimensions
        );
        Ok(())
    }

    async fn upsert(&self, points: &[IndexedPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let request = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&UpsertRequest { points });
        self.send(request, "upsert").await?;

        tracing::debug!("Upserted {} points into '{}'", points.len(), self.collection);
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize, filters: &FilterSet) -> Result<Vec<SearchHit>> {
        let body = SearchRequest {
            vector,
            limit,
            with_payload: true,
            filter: filter_clause(filters),
        };

        let request = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&body);

        let response: QdrantResponse<Vec<ScoredPoint>> = self
            .send(request, "search")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse search response: {}", e)))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                point.payload.map(|payload| SearchHit {
                    payload,
                    score: point.score,
                })
            })
            .collect())
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;
    use serde_json::Map;

    #[test]
    fn test_filter_clause() {
        assert!(filter_clause(&FilterSet::new()).is_none());

        let filters = FilterSet::new().with("year", 2024i64).with("filename", "a.pdf");
        assert_eq!(
            filter_clause(&filters).unwrap(),
            json!({
                "must": [
                    { "key": "filename", "match": { "value": "a.pdf" } },
                    { "key": "year", "match": { "value": 2024 } }
                ]
            })
        );
    }

    #[test]
    fn test_upsert_wire_shape() {
        let chunk = Chunk::new("hello.", 0, "a.txt");
        let point = IndexedPoint {
            id: chunk.point_id(),
            vector: vec![0.5, 0.5],
            payload: PointPayload::from_chunk(&chunk, &Map::new()),
        };
        let points = [point];
        let value = serde_json::to_value(UpsertRequest { points: &points }).unwrap();

        assert_eq!(value["points"][0]["id"], json!(chunk.point_id().to_string()));
        assert_eq!(value["points"][0]["payload"]["filename"], "a.txt");
        assert_eq!(value["points"][0]["payload"]["chunkIndex"], 0);
    }

    #[test]
    fn test_search_response_parsing() {
        let raw = json!({
            "result": [
                { "id": "8d3c1c8e-2f55-4d4e-9a43-1c1d5d4b2a10", "score": 0.91,
                  "payload": { "chunk": "Blue sky.", "filename": "a.pdf", "chunkIndex": 3 } },
                { "id": 7, "score": 0.5 }
            ],
            "status": "ok",
            "time": 0.001
        });

        let parsed: QdrantResponse<Vec<ScoredPoint>> = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.result.len(), 2);
        assert_eq!(parsed.result[0].payload.as_ref().unwrap().source_id, "a.pdf");
        assert!(parsed.result[1].payload.is_none());
    }
}
