use sha2::{Digest, Sha256};

/// Stable hash of the normalized text. Whitespace-only differences must not
/// change the fingerprint, because the duplicate gate uses it to recognize a
/// point's own future self.
pub fn content_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        hasher.update(trimmed.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Deterministic numeric point id for a file path, so re-indexing the same
/// path overwrites its previous point instead of accumulating orphans.
pub fn point_id(path: &str) -> u64 {
    let digest = Sha256::digest(path.as_bytes());
    u64::from_le_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}
