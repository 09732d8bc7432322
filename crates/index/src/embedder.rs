use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one snippet of source text. `language` is a short tag passed to
    /// the service as a prompt hint ("python", "rust", ...).
    async fn embed(&self, text: &str, language: &str) -> Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
}

/// Client for the external embedding service. Responses are cached in-process
/// keyed on the content hash, since the hook frequently embeds the same text
/// twice (query then upsert).
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    dims: usize,
    cache: Mutex<HashMap<(String, String), Vec<f32>>>,
}

#[derive(serde::Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
    language: &'a str,
}

#[derive(serde::Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(base_url: String, dims: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            dims,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(text: &str, language: &str) -> (String, String) {
        (
            hex::encode(Sha256::digest(text.as_bytes())),
            language.to_string(),
        )
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str, language: &str) -> Result<Vec<f32>> {
        let key = Self::cache_key(text, language);
        if let Some(hit) = self.cache.lock().unwrap().get(&key) {
            return Ok(hit.clone());
        }

        let resp = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest { text, language })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Embedding service error {status}: {body}");
        }

        let parsed: EmbedResponse = resp.json().await?;
        if parsed.embedding.len() != self.dims {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dims,
                parsed.embedding.len()
            );
        }

        self.cache
            .lock()
            .unwrap()
            .insert(key, parsed.embedding.clone());
        Ok(parsed.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}
