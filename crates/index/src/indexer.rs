use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use warden_config::IndexerSettings;

use crate::embedder::Embedder;
use crate::fingerprint::{content_fingerprint, point_id};
use crate::qdrant::{PointPayload, QdrantClient};
use crate::walker::{self, FileEntry};
use crate::workspace::collection_name;

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub scanned: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Indexed,
    Unchanged,
    NotIndexable,
}

/// Seeds and maintains the duplicate-prevention collection for one workspace.
/// The vector store itself is the source of truth for change detection: each
/// point carries the content fingerprint it was indexed from.
pub struct WorkspaceIndexer {
    root: PathBuf,
    collection: String,
    embedder: Arc<dyn Embedder>,
    store: Arc<QdrantClient>,
    settings: IndexerSettings,
}

impl WorkspaceIndexer {
    pub fn new(
        root: &Path,
        embedder: Arc<dyn Embedder>,
        store: Arc<QdrantClient>,
        settings: IndexerSettings,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            collection: collection_name(root),
            embedder,
            store,
            settings,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full scan: walk the workspace and index every new or changed file.
    /// Per-file failures are logged and counted, never fatal.
    pub async fn build(&self) -> Result<IndexStats> {
        self.store
            .ensure_collection(&self.collection, self.embedder.dimensions())
            .await?;

        let entries = walker::walk_workspace(
            &self.root,
            &self.settings.exclude,
            self.settings.max_file_size,
        )?;
        let scanned = entries.len();

        let workers = self.settings.workers.max(1);
        let outcomes: Vec<Result<UpdateOutcome>> = futures::stream::iter(entries)
            .map(|entry| self.index_entry(entry))
            .buffer_unordered(workers)
            .collect()
            .await;

        let mut stats = IndexStats {
            scanned,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(UpdateOutcome::Indexed) => stats.indexed += 1,
                Ok(UpdateOutcome::Unchanged) | Ok(UpdateOutcome::NotIndexable) => {
                    stats.skipped += 1
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(error = %e, "Failed to index file");
                }
            }
        }
        Ok(stats)
    }

    /// Index a single file by absolute path, skipping when its fingerprint
    /// matches the stored point. Used by the watch loop.
    pub async fn update_file(&self, abs_path: &Path) -> Result<UpdateOutcome> {
        let Some(language) = walker::language_tag(abs_path) else {
            return Ok(UpdateOutcome::NotIndexable);
        };
        let content = tokio::fs::read_to_string(abs_path).await?;
        let rel = abs_path
            .strip_prefix(&self.root)
            .unwrap_or(abs_path)
            .to_string_lossy()
            .to_string();
        self.index_content(&rel, abs_path, language, &content).await
    }

    async fn index_entry(&self, entry: FileEntry) -> Result<UpdateOutcome> {
        let id = point_id(&entry.abs_path.to_string_lossy());
        if let Some(existing) = self.store.retrieve(&self.collection, id).await? {
            if existing.content_fingerprint == entry.fingerprint {
                return Ok(UpdateOutcome::Unchanged);
            }
        }
        let content = tokio::fs::read_to_string(&entry.abs_path).await?;
        self.embed_and_upsert(id, &entry.abs_path, entry.language, &content, &entry.fingerprint)
            .await?;
        Ok(UpdateOutcome::Indexed)
    }

    async fn index_content(
        &self,
        rel: &str,
        abs_path: &Path,
        language: &'static str,
        content: &str,
    ) -> Result<UpdateOutcome> {
        let fingerprint = content_fingerprint(content);
        let id = point_id(&abs_path.to_string_lossy());
        if let Some(existing) = self.store.retrieve(&self.collection, id).await? {
            if existing.content_fingerprint == fingerprint {
                tracing::debug!(file = rel, "Unchanged since last index");
                return Ok(UpdateOutcome::Unchanged);
            }
        }
        self.embed_and_upsert(id, abs_path, language, content, &fingerprint)
            .await?;
        tracing::info!(file = rel, "Indexed");
        Ok(UpdateOutcome::Indexed)
    }

    async fn embed_and_upsert(
        &self,
        id: u64,
        abs_path: &Path,
        language: &str,
        content: &str,
        fingerprint: &str,
    ) -> Result<()> {
        let vector = self.embedder.embed(content, language).await?;
        let payload = PointPayload {
            file_path: abs_path.to_string_lossy().to_string(),
            language: language.to_string(),
            content_fingerprint: fingerprint.to_string(),
            indexed_at: chrono::Utc::now().to_rfc3339(),
        };
        self.store
            .upsert(&self.collection, id, &vector, &payload)
            .await
    }
}
