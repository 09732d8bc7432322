use std::path::{Path, PathBuf};

/// Walk upward from `start` to the first directory containing a `.git` entry
/// (file or directory; worktrees use a file). Falls back to `start` itself
/// when no repository marker exists.
pub fn find_workspace_root(start: &Path) -> PathBuf {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".git").exists() {
            return current;
        }
        if !current.pop() {
            return start.to_path_buf();
        }
    }
}

/// Deterministic vector-store collection name for a workspace. Two processes
/// starting anywhere inside the same repository must agree on this.
pub fn collection_name(root: &Path) -> String {
    let raw = root.to_string_lossy().to_lowercase();
    let mut slug = String::with_capacity(raw.len());
    let mut last_was_sep = true;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    let slug = slug.trim_end_matches('_');
    format!("{slug}_duplicate_prevention")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_name_is_deterministic() {
        let a = collection_name(Path::new("/home/user/github/my-project"));
        let b = collection_name(Path::new("/home/user/github/my-project"));
        assert_eq!(a, b);
        assert_eq!(a, "home_user_github_my_project_duplicate_prevention");
    }

    #[test]
    fn collection_name_collapses_separator_runs() {
        let name = collection_name(Path::new("/srv//data/repo"));
        assert_eq!(name, "srv_data_repo_duplicate_prevention");
    }

    #[test]
    fn workspace_root_detects_git_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("repo");
        let nested = root.join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();

        assert_eq!(find_workspace_root(&nested), root);
        assert_eq!(find_workspace_root(&root), root);
    }

    #[test]
    fn workspace_root_detects_git_file() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("worktree");
        let nested = root.join("lib");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(".git"), "gitdir: /elsewhere").unwrap();

        assert_eq!(find_workspace_root(&nested), root);
    }

    #[test]
    fn workspace_root_falls_back_to_start() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("no-repo");
        std::fs::create_dir_all(&dir).unwrap();
        assert_eq!(find_workspace_root(&dir), dir);
    }
}
