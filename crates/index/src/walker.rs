use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::fingerprint::content_fingerprint;

const MAX_FILES: usize = 50_000;

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub fingerprint: String,
    pub language: &'static str,
}

/// Language tag for a source file, used both as the embedding prompt hint and
/// as the gate for which files the duplicate check considers at all.
pub fn language_tag(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str())?.to_lowercase();
    let tag = match ext.as_str() {
        "rs" => "rust",
        "py" | "pyi" => "python",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "mts" | "cts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" | "hh" => "cpp",
        "rb" => "ruby",
        "ex" | "exs" => "elixir",
        "hs" => "haskell",
        "cs" => "csharp",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "lua" => "lua",
        "sh" | "bash" | "zsh" => "shell",
        "sql" => "sql",
        "php" => "php",
        _ => return None,
    };
    Some(tag)
}

/// Enumerate indexable files under `root`, sorted by relative path.
pub fn walk_workspace(root: &Path, extra_exclude: &[String], max_file_size: u64) -> Result<Vec<FileEntry>> {
    let gitignore = load_gitignore(root);
    let mut entries = Vec::new();
    walk_dir(root, root, &gitignore, extra_exclude, max_file_size, &mut entries);
    entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(entries)
}

fn walk_dir(
    root: &Path,
    dir: &Path,
    gitignore: &[String],
    extra_exclude: &[String],
    max_file_size: u64,
    out: &mut Vec<FileEntry>,
) {
    if out.len() >= MAX_FILES || !dir.is_dir() {
        return;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        if out.len() >= MAX_FILES {
            return;
        }
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        if should_skip_dir_name(&name_str) {
            continue;
        }

        let rel = match path.strip_prefix(root) {
            Ok(r) => r.to_string_lossy().to_string(),
            Err(_) => continue,
        };

        if is_ignored(&rel, gitignore, extra_exclude) {
            continue;
        }

        if path.is_dir() {
            walk_dir(root, &path, gitignore, extra_exclude, max_file_size, out);
        } else if path.is_file() {
            let Some(language) = language_tag(&path) else {
                continue;
            };
            let meta = match std::fs::metadata(&path) {
                Ok(m) => m,
                Err(_) => continue,
            };
            if meta.len() > max_file_size {
                continue;
            }

            let content = match std::fs::read(&path) {
                Ok(c) => c,
                Err(_) => continue,
            };
            // Binary sniff: NUL byte in the leading window.
            if content.iter().take(512).any(|b| *b == 0) {
                continue;
            }
            let text = String::from_utf8_lossy(&content);

            out.push(FileEntry {
                rel_path: rel,
                abs_path: path,
                fingerprint: content_fingerprint(&text),
                language,
            });
        }
    }
}

fn should_skip_dir_name(name: &str) -> bool {
    name.starts_with('.')
        || matches!(
            name,
            "node_modules"
                | "target"
                | "__pycache__"
                | "vendor"
                | "dist"
                | "build"
                | "venv"
                | "env"
                | "coverage"
                | "out"
        )
}

fn load_gitignore(root: &Path) -> Vec<String> {
    match std::fs::read_to_string(root.join(".gitignore")) {
        Ok(content) => content
            .lines()
            .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
            .map(|l| l.trim().to_string())
            .collect(),
        Err(_) => vec![],
    }
}

fn is_ignored(rel_path: &str, gitignore: &[String], extra_exclude: &[String]) -> bool {
    for pattern in gitignore.iter().chain(extra_exclude.iter()) {
        let pat = pattern.trim_start_matches('/').trim_end_matches('/');
        if pat.is_empty() {
            continue;
        }
        if rel_path == pat
            || rel_path.starts_with(&format!("{pat}/"))
            || rel_path.contains(&format!("/{pat}/"))
            || rel_path.ends_with(&format!("/{pat}"))
        {
            return true;
        }
        if let Some(ext) = pat.strip_prefix("*.") {
            if rel_path.ends_with(&format!(".{ext}")) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tags() {
        assert_eq!(language_tag(Path::new("main.rs")), Some("rust"));
        assert_eq!(language_tag(Path::new("app.py")), Some("python"));
        assert_eq!(language_tag(Path::new("index.tsx")), Some("typescript"));
        assert_eq!(language_tag(Path::new("image.png")), None);
        assert_eq!(language_tag(Path::new("README.md")), None);
    }

    #[test]
    fn skip_dir_names() {
        assert!(should_skip_dir_name("node_modules"));
        assert!(should_skip_dir_name(".git"));
        assert!(should_skip_dir_name("__pycache__"));
        assert!(!should_skip_dir_name("src"));
    }

    #[test]
    fn walk_respects_gitignore_and_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("generated")).unwrap();
        std::fs::write(root.join(".gitignore"), "generated/\n*.min.js\n").unwrap();
        std::fs::write(root.join("src/lib.rs"), "pub fn a() {}\n").unwrap();
        std::fs::write(root.join("src/app.min.js"), "x\n").unwrap();
        std::fs::write(root.join("generated/gen.py"), "print(1)\n").unwrap();
        std::fs::write(root.join("notes.txt"), "hello\n").unwrap();

        let entries = walk_workspace(root, &[], 512 * 1024).unwrap();
        let rels: Vec<&str> = entries.iter().map(|e| e.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["src/lib.rs"]);
        assert_eq!(entries[0].language, "rust");
    }

    #[test]
    fn walk_skips_oversized_and_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("big.py"), "x".repeat(2048)).unwrap();
        std::fs::write(root.join("blob.rs"), b"fn\x00main").unwrap();
        std::fs::write(root.join("ok.py"), "print(1)\n").unwrap();

        let entries = walk_workspace(root, &[], 1024).unwrap();
        let rels: Vec<&str> = entries.iter().map(|e| e.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["ok.py"]);
    }
}
