pub mod embedder;
pub mod fingerprint;
pub mod health;
pub mod indexer;
pub mod qdrant;
pub mod walker;
pub mod watcher;
pub mod workspace;

pub use embedder::{Embedder, HttpEmbedder};
pub use fingerprint::{content_fingerprint, point_id};
pub use indexer::{IndexStats, WorkspaceIndexer};
pub use qdrant::{PointPayload, QdrantClient, ScoredPoint};
pub use workspace::{collection_name, find_workspace_root};
