use std::io::{BufRead, IsTerminal, Write};

/// Interactive means all three standard streams are attached to a terminal.
/// Pipelines and CI never satisfy this, so they can never hang on a prompt.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal()
        && std::io::stdout().is_terminal()
        && std::io::stderr().is_terminal()
}

/// Ask the user whether to allow a flagged action. `y`/`yes` admits; an empty
/// answer takes the default (deny unless `default_yes`); EOF or a read error
/// denies.
pub fn ask_permission(message: &str, default_yes: bool) -> bool {
    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "{message}");
    let prompt = if default_yes {
        "Allow this action? (Y/n): "
    } else {
        "Allow this action? (y/N): "
    };
    let _ = write!(stderr, "{prompt}");
    let _ = stderr.flush();

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    let answer = line.trim().to_lowercase();
    if answer.is_empty() {
        return default_yes;
    }
    matches!(answer.as_str(), "y" | "yes")
}
