use std::io::Write;
use std::path::Path;

/// Append one timestamped line to a best-effort audit log. Concurrent hook
/// processes rely on O_APPEND semantics; a failed append is logged and
/// swallowed, never surfaced to the host.
pub fn append(log_dir: &Path, file_name: &str, line: &str) {
    if let Err(e) = try_append(log_dir, file_name, line) {
        tracing::warn!(error = %e, file = file_name, "Audit log append failed");
    }
}

fn try_append(log_dir: &Path, file_name: &str, line: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(file_name))?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
        line
    )
}
