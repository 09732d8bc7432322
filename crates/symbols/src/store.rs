use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::{Symbol, SymbolKind};

pub const INDEX_FILE_NAME: &str = ".code_index.db";

/// Embedded symbol database at the repository root. One file per repository;
/// records are unique on (name, kind, file_path, line).
pub struct SymbolStore {
    conn: std::sync::Mutex<Connection>,
    db_path: PathBuf,
}

impl SymbolStore {
    pub fn open(repo_root: &Path) -> Result<Self> {
        let db_path = repo_root.join(INDEX_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;",
        )?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS symbols (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                file_path TEXT NOT NULL,
                line INTEGER NOT NULL,
                column INTEGER NOT NULL DEFAULT 0,
                parent TEXT,
                signature TEXT,
                docstring TEXT,
                file_hash TEXT NOT NULL,
                indexed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(name, kind, file_path, line)
            );
            CREATE INDEX IF NOT EXISTS idx_symbol_name ON symbols(name);
            CREATE INDEX IF NOT EXISTS idx_symbol_kind ON symbols(kind);
            CREATE INDEX IF NOT EXISTS idx_symbol_file ON symbols(file_path);
            CREATE TABLE IF NOT EXISTS file_hashes (
                file_path TEXT PRIMARY KEY,
                hash TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn needs_reindex(&self, file_path: &str, hash: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let stored: Option<String> = conn
            .query_row(
                "SELECT hash FROM file_hashes WHERE file_path = ?1",
                params![file_path],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(stored.as_deref() != Some(hash))
    }

    /// Replace every record for a file in one transaction.
    pub fn replace_file_symbols(
        &self,
        file_path: &str,
        hash: &str,
        symbols: &[Symbol],
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM symbols WHERE file_path = ?1",
            params![file_path],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO symbols
                 (name, kind, file_path, line, column, parent, signature, docstring, file_hash, indexed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            let now = chrono::Utc::now().to_rfc3339();
            for s in symbols {
                stmt.execute(params![
                    s.name,
                    s.kind.as_str(),
                    file_path,
                    s.line as i64,
                    s.column as i64,
                    s.parent,
                    s.signature,
                    s.docstring,
                    hash,
                    now,
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO file_hashes (file_path, hash) VALUES (?1, ?2)
             ON CONFLICT(file_path) DO UPDATE SET hash = ?2",
            params![file_path, hash],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Drop records for files absent from `current`. Returns how many files
    /// were removed.
    pub fn remove_missing(&self, current: &[String]) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT file_path FROM file_hashes")?;
        let stored: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);

        let current_set: std::collections::HashSet<&str> =
            current.iter().map(|s| s.as_str()).collect();
        let mut removed = 0;
        for path in stored {
            if !current_set.contains(path.as_str()) {
                conn.execute("DELETE FROM symbols WHERE file_path = ?1", params![path])?;
                conn.execute(
                    "DELETE FROM file_hashes WHERE file_path = ?1",
                    params![path],
                )?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Name search with `*` and `?` wildcards. Exact matches sort first, then
    /// kind priority (class, function, method, other), then name length, then
    /// alphabetical.
    pub fn search_name(
        &self,
        pattern: &str,
        kind: Option<SymbolKind>,
        limit: usize,
    ) -> Result<Vec<Symbol>> {
        let sql_pattern = pattern.replace('*', "%").replace('?', "_");
        let conn = self.conn.lock().unwrap();

        let base = "SELECT name, kind, file_path, line, column, parent, signature, docstring
             FROM symbols WHERE name LIKE ?1";
        let order = "ORDER BY
                CASE WHEN name = ?2 THEN 0 ELSE 1 END,
                CASE kind
                    WHEN 'class' THEN 0
                    WHEN 'function' THEN 1
                    WHEN 'method' THEN 2
                    ELSE 3
                END,
                length(name),
                name";

        let mut results = Vec::new();
        if let Some(kind) = kind {
            let sql = format!("{base} AND kind = ?4 {order} LIMIT ?3");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![sql_pattern, pattern, limit as i64, kind.as_str()],
                row_to_symbol,
            )?;
            for row in rows {
                results.push(row?);
            }
        } else {
            let sql = format!("{base} {order} LIMIT ?3");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![sql_pattern, pattern, limit as i64], row_to_symbol)?;
            for row in rows {
                results.push(row?);
            }
        }
        Ok(results)
    }

    /// Every symbol of one kind, alphabetical.
    pub fn list_kind(&self, kind: SymbolKind, limit: usize) -> Result<Vec<Symbol>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT name, kind, file_path, line, column, parent, signature, docstring
             FROM symbols WHERE kind = ?1 ORDER BY name, file_path LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![kind.as_str(), limit as i64], row_to_symbol)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Every symbol in one file, in line order.
    pub fn file_symbols(&self, file_path: &str) -> Result<Vec<Symbol>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT name, kind, file_path, line, column, parent, signature, docstring
             FROM symbols WHERE file_path = ?1 ORDER BY line",
        )?;
        let rows = stmt.query_map(params![file_path], row_to_symbol)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Symbols in files matching a path pattern, optionally filtered by a
    /// name pattern. Both accept `*`/`?` wildcards.
    pub fn search_files(
        &self,
        file_pattern: &str,
        name_pattern: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Symbol>> {
        let file_like = format!(
            "%{}%",
            file_pattern.replace('*', "%").replace('?', "_")
        );
        let name_like = name_pattern
            .map(|p| p.replace('*', "%").replace('?', "_"))
            .unwrap_or_else(|| "%".to_string());
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT name, kind, file_path, line, column, parent, signature, docstring
             FROM symbols WHERE file_path LIKE ?1 AND name LIKE ?2
             ORDER BY file_path, line LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![file_like, name_like, limit as i64], row_to_symbol)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn symbol_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM symbols", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_symbol(row: &rusqlite::Row<'_>) -> rusqlite::Result<Symbol> {
    let kind_str: String = row.get(1)?;
    Ok(Symbol {
        name: row.get(0)?,
        kind: SymbolKind::parse(&kind_str).unwrap_or(SymbolKind::Variable),
        file_path: row.get(2)?,
        line: row.get::<_, i64>(3)? as usize,
        column: row.get::<_, i64>(4)? as usize,
        parent: row.get(5)?,
        signature: row.get(6)?,
        docstring: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, kind: SymbolKind, line: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind,
            file_path: String::new(),
            line,
            column: 0,
            parent: None,
            signature: None,
            docstring: None,
        }
    }

    fn seeded_store(tmp: &Path) -> SymbolStore {
        let store = SymbolStore::open(tmp).unwrap();
        store
            .replace_file_symbols(
                "src/app.py",
                "hash-a",
                &[
                    sample("get_user", SymbolKind::Function, 10),
                    sample("get_user_by_id", SymbolKind::Function, 20),
                    sample("UserService", SymbolKind::Class, 1),
                    sample("get", SymbolKind::Method, 5),
                ],
            )
            .unwrap();
        store
            .replace_file_symbols(
                "src/util.py",
                "hash-b",
                &[sample("get_user", SymbolKind::Class, 3)],
            )
            .unwrap();
        store
    }

    #[test]
    fn wildcard_search_translates_to_like() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(tmp.path());
        let hits = store.search_name("get_*", None, 20).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|s| s.name.starts_with("get_")));
    }

    #[test]
    fn exact_match_sorts_first_then_kind_priority() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(tmp.path());
        let hits = store.search_name("get_user", None, 20).unwrap();
        // Both exact matches precede everything; class outranks function.
        assert_eq!(hits[0].name, "get_user");
        assert_eq!(hits[0].kind, SymbolKind::Class);
        assert_eq!(hits[1].name, "get_user");
        assert_eq!(hits[1].kind, SymbolKind::Function);
    }

    #[test]
    fn kind_filter_restricts_results() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(tmp.path());
        let hits = store
            .search_name("get*", Some(SymbolKind::Method), 20)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "get");
    }

    #[test]
    fn file_symbols_in_line_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(tmp.path());
        let hits = store.file_symbols("src/app.py").unwrap();
        assert_eq!(hits.len(), 4);
        assert!(hits.windows(2).all(|w| w[0].line <= w[1].line));
    }

    #[test]
    fn search_files_with_name_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(tmp.path());
        let hits = store
            .search_files("util", Some("get*"), 20)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_path, "src/util.py");
    }

    #[test]
    fn reindex_detection_by_hash() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(tmp.path());
        assert!(!store.needs_reindex("src/app.py", "hash-a").unwrap());
        assert!(store.needs_reindex("src/app.py", "hash-changed").unwrap());
        assert!(store.needs_reindex("src/new.py", "anything").unwrap());
    }

    #[test]
    fn remove_missing_drops_stale_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(tmp.path());
        let removed = store.remove_missing(&["src/app.py".to_string()]).unwrap();
        assert_eq!(removed, 1);
        assert!(store.file_symbols("src/util.py").unwrap().is_empty());
        assert!(!store.file_symbols("src/app.py").unwrap().is_empty());
    }
}
