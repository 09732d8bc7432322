pub mod collect;
pub mod gemini;
pub mod usage;

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

pub use gemini::{GeminiClient, SUPPORTED_MODELS};
pub use usage::{UsageSummary, UsageTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewKind {
    /// Broad review: correctness, security, maintainability.
    General,
    /// Narrow hunt for defects with concrete failure scenarios.
    BugHunt,
}

impl ReviewKind {
    fn task_type(&self) -> &'static str {
        match self {
            ReviewKind::General => "review",
            ReviewKind::BugHunt => "find_bugs",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            ReviewKind::General => {
                "Review the following codebase. Report concrete problems in \
                 correctness, error handling, security, and maintainability, with \
                 file and line references. Order findings by severity."
            }
            ReviewKind::BugHunt => {
                "Hunt for bugs in the following codebase. Report only defects that \
                 produce wrong behavior, each with the triggering input or state, \
                 the expected and actual outcome, and a file/line reference. No \
                 style commentary."
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewOptions {
    /// Focus areas inserted verbatim into the prompt.
    pub focus: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub text: String,
    pub files_reviewed: usize,
    pub skipped_too_large: Vec<String>,
    pub usage: UsageSummary,
}

/// Assemble the full review prompt: rules document, directory tree, then
/// every file fenced with its language tag.
pub fn build_prompt(
    kind: ReviewKind,
    collection: &collect::Collection,
    rules: Option<&str>,
    options: &ReviewOptions,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(kind.instructions());
    prompt.push_str("\n\n");

    if !options.focus.is_empty() {
        prompt.push_str("Focus areas:\n");
        for area in &options.focus {
            prompt.push_str(&format!("- {area}\n"));
        }
        prompt.push('\n');
    }

    if let Some(rules) = rules {
        prompt.push_str("Project rules:\n\n");
        prompt.push_str(rules);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Directory layout:\n\n");
    prompt.push_str(&collect::render_tree(&collection.files));
    prompt.push('\n');

    for file in &collection.files {
        prompt.push_str(&format!(
            "### {}\n\n```{}\n{}\n```\n\n",
            file.rel_path, file.language, file.content
        ));
    }

    prompt
}

/// Run one review over an absolute directory and return the model's report
/// plus a usage summary.
pub async fn run_review(
    dir: &Path,
    kind: ReviewKind,
    options: &ReviewOptions,
    settings: &warden_config::ReviewSettings,
) -> Result<ReviewReport> {
    let client = GeminiClient::new(settings.model.clone())?;
    run_review_with_client(dir, kind, options, settings, &client).await
}

pub async fn run_review_with_client(
    dir: &Path,
    kind: ReviewKind,
    options: &ReviewOptions,
    settings: &warden_config::ReviewSettings,
    client: &GeminiClient,
) -> Result<ReviewReport> {
    let collection = collect::collect_files(dir, settings.max_file_bytes)?;
    if collection.files.is_empty() {
        anyhow::bail!("No reviewable source files under {}", dir.display());
    }
    let rules = collect::load_rules(dir);
    let prompt = build_prompt(kind, &collection, rules.as_deref(), options);

    let mut tracker = UsageTracker::new(settings.pricing.clone());
    let result = client.generate(&prompt).await?;
    tracker.record(kind.task_type(), result.input_tokens, result.output_tokens);

    Ok(ReviewReport {
        text: result.text,
        files_reviewed: collection.files.len(),
        skipped_too_large: collection.skipped_too_large,
        usage: tracker.summary(client.model()),
    })
}
