use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use warden_symbols::{SymbolKind, SymbolStore};

use crate::server::{ToolDef, ToolProvider};

const DEFAULT_LIMIT: usize = 50;

/// Symbol-search tool surface backed by the repository's `.code_index.db`.
/// The index is refreshed once at startup; `search_in_files` and friends read
/// whatever the indexer last wrote.
pub struct SymbolSearchProvider {
    repo_root: PathBuf,
}

impl SymbolSearchProvider {
    pub fn new(repo_root: PathBuf) -> Self {
        if let Err(e) = warden_symbols::index_repository(&repo_root) {
            tracing::warn!(error = %e, "Initial symbol index failed; serving stale data");
        }
        Self { repo_root }
    }

    fn store(&self) -> Result<SymbolStore> {
        SymbolStore::open(&self.repo_root)
    }
}

fn arg_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(|v| v.as_str())
}

fn arg_limit(arguments: &Value) -> usize {
    arguments
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(DEFAULT_LIMIT)
}

fn parse_kind(arguments: &Value) -> Result<Option<SymbolKind>> {
    match arg_str(arguments, "kind") {
        None => Ok(None),
        Some(raw) => SymbolKind::parse(raw)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("Unknown symbol kind: {raw}")),
    }
}

fn render(symbols: &[warden_symbols::Symbol]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&json!({
        "count": symbols.len(),
        "results": symbols,
    }))?)
}

#[async_trait]
impl ToolProvider for SymbolSearchProvider {
    fn server_name(&self) -> &str {
        "warden-code-search"
    }

    fn tools(&self) -> Vec<ToolDef> {
        vec![
            ToolDef {
                name: "search_code".to_string(),
                description: "Search symbols by name. Supports * and ? wildcards, \
                              optional kind filter (function/class/method/variable)."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Name pattern, e.g. get_* "},
                        "kind": {"type": "string", "enum": ["function", "class", "method", "variable"]},
                        "limit": {"type": "integer"}
                    },
                    "required": ["query"]
                }),
            },
            ToolDef {
                name: "list_symbols".to_string(),
                description: "List every symbol of one kind.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "kind": {"type": "string", "enum": ["function", "class", "method", "variable"]},
                        "limit": {"type": "integer"}
                    },
                    "required": ["kind"]
                }),
            },
            ToolDef {
                name: "explore_file".to_string(),
                description: "All symbols defined in one file, in line order.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Repository-relative path"}
                    },
                    "required": ["file_path"]
                }),
            },
            ToolDef {
                name: "search_in_files".to_string(),
                description: "Search symbols within files matching a path pattern, \
                              optionally filtered by a name pattern."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "file_pattern": {"type": "string"},
                        "name_pattern": {"type": "string"},
                        "limit": {"type": "integer"}
                    },
                    "required": ["file_pattern"]
                }),
            },
        ]
    }

    async fn call(&self, name: &str, arguments: &Value) -> Result<String> {
        let store = self.store()?;
        match name {
            "search_code" => {
                let query = arg_str(arguments, "query")
                    .ok_or_else(|| anyhow::anyhow!("search_code requires 'query'"))?;
                let kind = parse_kind(arguments)?;
                let results = store.search_name(query, kind, arg_limit(arguments))?;
                render(&results)
            }
            "list_symbols" => {
                let kind = parse_kind(arguments)?
                    .ok_or_else(|| anyhow::anyhow!("list_symbols requires 'kind'"))?;
                let results = store.list_kind(kind, arg_limit(arguments))?;
                render(&results)
            }
            "explore_file" => {
                let file_path = arg_str(arguments, "file_path")
                    .ok_or_else(|| anyhow::anyhow!("explore_file requires 'file_path'"))?;
                let results = store.file_symbols(file_path)?;
                render(&results)
            }
            "search_in_files" => {
                let file_pattern = arg_str(arguments, "file_pattern")
                    .ok_or_else(|| anyhow::anyhow!("search_in_files requires 'file_pattern'"))?;
                let results = store.search_files(
                    file_pattern,
                    arg_str(arguments, "name_pattern"),
                    arg_limit(arguments),
                )?;
                render(&results)
            }
            other => anyhow::bail!("Unknown tool: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_fixture() -> (tempfile::TempDir, SymbolSearchProvider) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("svc.py"),
            "class OrderService:\n    def place_order(self):\n        pass\n",
        )
        .unwrap();
        let provider = SymbolSearchProvider::new(tmp.path().to_path_buf());
        (tmp, provider)
    }

    #[tokio::test]
    async fn search_code_finds_class() {
        let (_tmp, provider) = provider_with_fixture();
        let out = provider
            .call("search_code", &json!({"query": "Order*"}))
            .await
            .unwrap();
        assert!(out.contains("OrderService"));
        assert!(out.contains("\"count\": 1"));
    }

    #[tokio::test]
    async fn explore_file_lists_symbols_in_order() {
        let (_tmp, provider) = provider_with_fixture();
        let out = provider
            .call("explore_file", &json!({"file_path": "svc.py"}))
            .await
            .unwrap();
        assert!(out.contains("OrderService"));
        assert!(out.contains("place_order"));
    }

    #[tokio::test]
    async fn bad_kind_is_an_error() {
        let (_tmp, provider) = provider_with_fixture();
        assert!(provider
            .call("search_code", &json!({"query": "x", "kind": "module"}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn manifest_has_four_tools() {
        let (_tmp, provider) = provider_with_fixture();
        let names: Vec<String> = provider.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["search_code", "list_symbols", "explore_file", "search_in_files"]
        );
    }
}
