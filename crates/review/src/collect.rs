use std::path::Path;

use anyhow::Result;
use warden_index::walker;

#[derive(Debug, Clone)]
pub struct CollectedFile {
    pub rel_path: String,
    pub language: &'static str,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct Collection {
    pub files: Vec<CollectedFile>,
    /// Relative paths skipped for exceeding the size cap, reported to the
    /// caller rather than silently dropped.
    pub skipped_too_large: Vec<String>,
}

/// Gather the source files under `dir` for a review prompt. Larger files are
/// reported, not truncated; a truncated file reviews worse than none.
pub fn collect_files(dir: &Path, max_file_bytes: u64) -> Result<Collection> {
    // Walk with a generous cap, then partition against the review cap so the
    // oversized files can be named in the report.
    let entries = walker::walk_workspace(dir, &[], 4 * 1024 * 1024)?;
    let mut collection = Collection::default();

    for entry in entries {
        let Ok(meta) = std::fs::metadata(&entry.abs_path) else {
            continue;
        };
        if meta.len() > max_file_bytes {
            collection.skipped_too_large.push(entry.rel_path);
            continue;
        }
        match std::fs::read_to_string(&entry.abs_path) {
            Ok(content) => collection.files.push(CollectedFile {
                rel_path: entry.rel_path,
                language: entry.language,
                content,
            }),
            Err(e) => {
                tracing::warn!(file = %entry.rel_path, error = %e, "Unreadable; skipping");
            }
        }
    }
    Ok(collection)
}

/// Project-rules document included verbatim at the top of the prompt when
/// present.
pub fn load_rules(dir: &Path) -> Option<String> {
    for candidate in ["AGENTS.md", "CLAUDE.md", "RULES.md"] {
        if let Ok(content) = std::fs::read_to_string(dir.join(candidate)) {
            if !content.trim().is_empty() {
                return Some(content);
            }
        }
    }
    None
}

/// Indented directory tree of the collected files.
pub fn render_tree(files: &[CollectedFile]) -> String {
    let mut tree = String::new();
    let mut last_dir = String::new();
    for file in files {
        let (dir, name) = match file.rel_path.rsplit_once('/') {
            Some((d, n)) => (d.to_string(), n),
            None => (String::new(), file.rel_path.as_str()),
        };
        if dir != last_dir {
            if dir.is_empty() {
                tree.push_str(".\n");
            } else {
                tree.push_str(&format!("{dir}/\n"));
            }
            last_dir = dir;
        }
        tree.push_str(&format!("  {name}\n"));
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_and_reports_oversized() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("small.py"), "print(1)\n").unwrap();
        std::fs::write(root.join("big.py"), "x".repeat(4096)).unwrap();

        let collection = collect_files(root, 1024).unwrap();
        assert_eq!(collection.files.len(), 1);
        assert_eq!(collection.files[0].rel_path, "small.py");
        assert_eq!(collection.skipped_too_large, vec!["big.py".to_string()]);
    }

    #[test]
    fn rules_doc_is_optional() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_rules(tmp.path()).is_none());
        std::fs::write(tmp.path().join("AGENTS.md"), "# Rules\nBe careful.\n").unwrap();
        assert!(load_rules(tmp.path()).unwrap().contains("Be careful"));
    }

    #[test]
    fn tree_groups_by_directory() {
        let files = vec![
            CollectedFile {
                rel_path: "src/a.rs".into(),
                language: "rust",
                content: String::new(),
            },
            CollectedFile {
                rel_path: "src/b.rs".into(),
                language: "rust",
                content: String::new(),
            },
            CollectedFile {
                rel_path: "main.rs".into(),
                language: "rust",
                content: String::new(),
            },
        ];
        let tree = render_tree(&files);
        assert!(tree.contains("src/\n  a.rs\n  b.rs\n"));
        assert!(tree.contains("  main.rs"));
    }
}
