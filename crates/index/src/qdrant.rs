use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Payload attached to every vector point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointPayload {
    pub file_path: String,
    pub language: String,
    pub content_fingerprint: String,
    pub indexed_at: String,
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: u64,
    pub score: f32,
    pub payload: Option<PointPayload>,
}

/// Thin REST client for the Qdrant vector store. Every operation carries a
/// bounded timeout; callers treat failures as a degraded safety net, not a
/// hard dependency.
pub struct QdrantClient {
    client: reqwest::Client,
    base_url: String,
}

impl QdrantClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create the collection if it does not exist. Idempotent.
    pub async fn ensure_collection(&self, name: &str, dim: usize) -> Result<()> {
        let probe = self
            .client
            .get(format!("{}/collections/{name}", self.base_url))
            .send()
            .await?;
        if probe.status().is_success() {
            return Ok(());
        }

        let body = serde_json::json!({
            "vectors": { "size": dim, "distance": "Cosine" }
        });
        let resp = self
            .client
            .put(format!("{}/collections/{name}", self.base_url))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            // Lost the creation race to another hook process.
            if text.contains("already exists") {
                return Ok(());
            }
            anyhow::bail!("Vector store create collection {name} failed ({status}): {text}");
        }
        Ok(())
    }

    pub async fn upsert(
        &self,
        collection: &str,
        id: u64,
        vector: &[f32],
        payload: &PointPayload,
    ) -> Result<()> {
        let body = serde_json::json!({
            "points": [{ "id": id, "vector": vector, "payload": payload }]
        });
        let resp = self
            .client
            .put(format!(
                "{}/collections/{collection}/points?wait=true",
                self.base_url
            ))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Vector store upsert into {collection} failed ({status}): {text}");
        }
        Ok(())
    }

    pub async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        #[derive(Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            result: Vec<SearchHit>,
        }
        #[derive(Deserialize)]
        struct SearchHit {
            id: u64,
            score: f32,
            payload: Option<PointPayload>,
        }

        let body = serde_json::json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });
        let resp = self
            .client
            .post(format!(
                "{}/collections/{collection}/points/search",
                self.base_url
            ))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Vector store query on {collection} failed ({status}): {text}");
        }

        let parsed: SearchResponse = resp.json().await?;
        Ok(parsed
            .result
            .into_iter()
            .map(|hit| ScoredPoint {
                id: hit.id,
                score: hit.score,
                payload: hit.payload,
            })
            .collect())
    }

    /// Fetch a single point's payload, or None when the point is absent. Used
    /// by the indexer to skip files whose fingerprint has not changed.
    pub async fn retrieve(&self, collection: &str, id: u64) -> Result<Option<PointPayload>> {
        #[derive(Deserialize)]
        struct RetrieveResponse {
            result: Option<RetrievedPoint>,
        }
        #[derive(Deserialize)]
        struct RetrievedPoint {
            payload: Option<PointPayload>,
        }

        let resp = self
            .client
            .get(format!(
                "{}/collections/{collection}/points/{id}",
                self.base_url
            ))
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("Vector store retrieve from {collection} failed ({status})");
        }
        let parsed: RetrieveResponse = resp.json().await?;
        Ok(parsed.result.and_then(|p| p.payload))
    }

    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        let resp = self
            .client
            .delete(format!("{}/collections/{name}", self.base_url))
            .send()
            .await?;
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            let status = resp.status();
            anyhow::bail!("Vector store drop collection {name} failed ({status})");
        }
        Ok(())
    }
}
