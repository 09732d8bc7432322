use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use warden_config::DuplicateSettings;
use warden_index::walker::language_tag;
use warden_index::{
    collection_name, content_fingerprint, find_workspace_root, point_id, Embedder, PointPayload,
    QdrantClient,
};

use crate::guard::{Guard, GuardContext, SimilarMatch};
use crate::request::ToolKind;

/// Semantic near-duplicate gate. Queries the workspace's vector collection
/// for neighbors of the incoming content; a hit at or above the similarity
/// threshold blocks the write and names the existing code. New content is
/// indexed on the way through so later writes see it.
///
/// The vector store and embedding service are a best-effort safety net:
/// every infrastructure failure admits the action.
pub struct DuplicatePreventionGuard {
    embedder: Arc<dyn Embedder>,
    store: Arc<QdrantClient>,
    settings: DuplicateSettings,
}

impl DuplicatePreventionGuard {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<QdrantClient>,
        settings: DuplicateSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            settings,
        }
    }

    async fn check(
        &self,
        ctx: &mut GuardContext<'_>,
        text: &str,
        language: &'static str,
    ) -> Result<bool> {
        let file_path = ctx.request.file_path.clone();
        let start = Path::new(&file_path)
            .parent()
            .map(|p| p.to_path_buf())
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| Path::new(".").to_path_buf());
        let collection = collection_name(&find_workspace_root(&start));

        let fingerprint = content_fingerprint(text);
        let vector = self.embedder.embed(text, language).await?;

        self.store
            .ensure_collection(&collection, self.embedder.dimensions())
            .await?;

        let hits = self
            .store
            .query(&collection, &vector, self.settings.top_k)
            .await?;

        let similar: Vec<SimilarMatch> = hits
            .into_iter()
            .filter_map(|hit| {
                let payload = hit.payload?;
                // Self-matches: the same content anywhere, or the file's own
                // previous version.
                if payload.content_fingerprint == fingerprint || payload.file_path == file_path {
                    return None;
                }
                if hit.score < self.settings.similarity_threshold {
                    return None;
                }
                Some(SimilarMatch {
                    file_path: payload.file_path,
                    score: hit.score,
                })
            })
            .collect();

        if !similar.is_empty() {
            ctx.similar = similar;
            return Ok(true);
        }

        let payload = PointPayload {
            file_path: file_path.clone(),
            language: language.to_string(),
            content_fingerprint: fingerprint,
            indexed_at: chrono::Utc::now().to_rfc3339(),
        };
        self.store
            .upsert(&collection, point_id(&file_path), &vector, &payload)
            .await?;
        Ok(false)
    }
}

#[async_trait]
impl Guard for DuplicatePreventionGuard {
    fn name(&self) -> &'static str {
        "duplicate_prevention"
    }

    fn description(&self) -> &'static str {
        "Blocks near-duplicate code detected by semantic similarity"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        let req = ctx.request;
        if !matches!(req.tool, ToolKind::Write | ToolKind::Edit | ToolKind::MultiEdit) {
            return Ok(false);
        }
        if !self.settings.enabled || req.file_path.is_empty() {
            return Ok(false);
        }
        let Some(language) = language_tag(Path::new(&req.file_path)) else {
            return Ok(false);
        };
        let text = req.incoming_text();
        if text.lines().count() < self.settings.min_lines {
            return Ok(false);
        }

        match self.check(ctx, &text, language).await {
            Ok(triggered) => Ok(triggered),
            Err(e) => {
                // Fail open: the gate must never block on its own
                // infrastructure.
                tracing::warn!(error = %e, "Duplicate check unavailable; admitting");
                Ok(false)
            }
        }
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        let mut msg = format!(
            "[{}] blocked this write to {}.\n\nNear-duplicate code already exists:\n",
            self.name(),
            ctx.request.file_path
        );
        for m in &ctx.similar {
            msg.push_str(&format!(
                "  - {} ({}% similar)\n",
                m.file_path,
                (m.score * 100.0).round() as i64
            ));
        }
        msg.push_str(
            "\nExtend or reuse the existing implementation instead of writing a \
             parallel copy. If the overlap is intentional, refactor the shared \
             part into one place first.\n\
             \nIf a human operator has explicitly approved this, re-run with\n\
             HOOK_OVERRIDE_CODE=<code from your authenticator> set in the environment.\n",
        );
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::GuardAction;
    use crate::request::normalize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONTENT: &str = "def calculate_total(ns):\n total = 0\n for n in ns:\n  total += n\n return total\n";

    fn write_request(file_path: &str) -> crate::request::Request {
        normalize(&format!(
            r#"{{"tool_name":"Write","tool_input":{{"file_path":{},"content":{}}}}}"#,
            serde_json::to_string(file_path).unwrap(),
            serde_json::to_string(CONTENT).unwrap()
        ))
        .unwrap()
    }

    async fn mock_embedding(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [0.5, 0.5, 0.5]
            })))
            .mount(server)
            .await;
    }

    fn guard(embed_url: String, store_url: String) -> DuplicatePreventionGuard {
        let settings = DuplicateSettings {
            embedding_dimension: 3,
            ..Default::default()
        };
        DuplicatePreventionGuard::new(
            Arc::new(warden_index::HttpEmbedder::new(embed_url, 3)),
            Arc::new(QdrantClient::new(store_url)),
            settings,
        )
    }

    #[tokio::test]
    async fn blocks_with_match_list_when_similar_code_exists() {
        let embed = MockServer::start().await;
        let store = MockServer::start().await;
        mock_embedding(&embed).await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"status": "green"}
            })))
            .mount(&store)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": [{
                    "id": 9,
                    "score": 0.87,
                    "payload": {
                        "file_path": "/repo/original.py",
                        "language": "python",
                        "content_fingerprint": "other-fingerprint",
                        "indexed_at": "2025-01-01T00:00:00Z"
                    }
                }]
            })))
            .mount(&store)
            .await;

        let guard = guard(embed.uri(), store.uri());
        let request = write_request("/repo/new.py");
        let mut ctx = GuardContext::new(&request);
        assert!(guard.should_trigger(&mut ctx).await.unwrap());

        let msg = guard.message(&ctx);
        assert!(msg.contains("/repo/original.py"));
        assert!(msg.contains("87%"));
        assert_eq!(guard.default_action(), GuardAction::Block);
    }

    #[tokio::test]
    async fn identical_content_elsewhere_is_self_match() {
        let embed = MockServer::start().await;
        let store = MockServer::start().await;
        mock_embedding(&embed).await;

        let fingerprint = content_fingerprint(CONTENT);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"status": "green"}
            })))
            .mount(&store)
            .await;
        Mock::given(method("POST"))
            .and(path(format!(
                "/collections/{}/points/search",
                collection_name(&find_workspace_root(Path::new("/repo")))
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": [{
                    "id": 9,
                    "score": 0.99,
                    "payload": {
                        "file_path": "/repo/indexed.py",
                        "language": "python",
                        "content_fingerprint": fingerprint,
                        "indexed_at": "2025-01-01T00:00:00Z"
                    }
                }]
            })))
            .mount(&store)
            .await;
        // The non-duplicate path upserts the new point.
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"status": "acknowledged"}
            })))
            .mount(&store)
            .await;

        let guard = guard(embed.uri(), store.uri());
        let request = write_request("/repo/copy_elsewhere.py");
        let mut ctx = GuardContext::new(&request);
        assert!(!guard.should_trigger(&mut ctx).await.unwrap());
    }

    #[tokio::test]
    async fn below_threshold_scores_do_not_trigger() {
        let embed = MockServer::start().await;
        let store = MockServer::start().await;
        mock_embedding(&embed).await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"status": "green"}
            })))
            .mount(&store)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": [{
                    "id": 3,
                    "score": 0.41,
                    "payload": {
                        "file_path": "/repo/loosely_related.py",
                        "language": "python",
                        "content_fingerprint": "x",
                        "indexed_at": "2025-01-01T00:00:00Z"
                    }
                }]
            })))
            .mount(&store)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"status": "acknowledged"}
            })))
            .mount(&store)
            .await;

        let guard = guard(embed.uri(), store.uri());
        let request = write_request("/repo/new.py");
        let mut ctx = GuardContext::new(&request);
        assert!(!guard.should_trigger(&mut ctx).await.unwrap());
    }

    #[tokio::test]
    async fn infrastructure_failure_admits() {
        // No servers at these addresses: both clients fail fast.
        let guard = guard(
            "http://127.0.0.1:1".to_string(),
            "http://127.0.0.1:1".to_string(),
        );
        let request = write_request("/repo/new.py");
        let mut ctx = GuardContext::new(&request);
        assert!(!guard.should_trigger(&mut ctx).await.unwrap());
    }

    #[tokio::test]
    async fn short_or_non_source_content_is_ignored() {
        let guard = guard(
            "http://127.0.0.1:1".to_string(),
            "http://127.0.0.1:1".to_string(),
        );

        let short = normalize(
            r#"{"tool_name":"Write","tool_input":{"file_path":"/repo/x.py","content":"pass"}}"#,
        )
        .unwrap();
        let mut ctx = GuardContext::new(&short);
        assert!(!guard.should_trigger(&mut ctx).await.unwrap());

        let readme = normalize(&format!(
            r#"{{"tool_name":"Write","tool_input":{{"file_path":"/repo/README.md","content":{}}}}}"#,
            serde_json::to_string(CONTENT).unwrap()
        ))
        .unwrap();
        let mut ctx = GuardContext::new(&readme);
        assert!(!guard.should_trigger(&mut ctx).await.unwrap());
    }
}
