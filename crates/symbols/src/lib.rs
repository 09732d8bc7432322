pub mod extract;
pub mod store;

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::Digest;

pub use store::SymbolStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Variable,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Variable => "variable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(SymbolKind::Function),
            "class" => Some(SymbolKind::Class),
            "method" => Some(SymbolKind::Method),
            "variable" => Some(SymbolKind::Variable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    pub parent: Option<String>,
    pub signature: Option<String>,
    pub docstring: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOutcome {
    pub scanned: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub removed: usize,
}

/// Index every supported source file under `root` into the repository's
/// `.code_index.db`, re-extracting only files whose content hash changed and
/// dropping records for files that no longer exist.
pub fn index_repository(root: &Path) -> Result<IndexOutcome> {
    let store = SymbolStore::open(root)?;
    let entries = warden_index::walker::walk_workspace(root, &[], 512 * 1024)?;

    let mut outcome = IndexOutcome::default();
    let mut seen = Vec::new();

    for entry in &entries {
        if !extract::supports_language(entry.language) {
            continue;
        }
        outcome.scanned += 1;
        seen.push(entry.rel_path.clone());

        let content = match std::fs::read_to_string(&entry.abs_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(file = %entry.rel_path, error = %e, "Unreadable; skipping");
                continue;
            }
        };
        let hash = hex::encode(sha2::Sha256::digest(content.as_bytes()));
        if !store.needs_reindex(&entry.rel_path, &hash)? {
            outcome.skipped += 1;
            continue;
        }

        let symbols = extract::extract(&entry.rel_path, &content, entry.language);
        store.replace_file_symbols(&entry.rel_path, &hash, &symbols)?;
        outcome.indexed += 1;
    }

    outcome.removed = store.remove_missing(&seen)?;
    Ok(outcome)
}
