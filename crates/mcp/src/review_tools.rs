use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use warden_config::ReviewSettings;
use warden_review::{GeminiClient, ReviewKind, ReviewOptions, SUPPORTED_MODELS};

use crate::server::{ToolDef, ToolProvider};

/// Code-review tool surface delegating to the Gemini orchestrator.
pub struct ReviewProvider {
    settings: ReviewSettings,
}

impl ReviewProvider {
    pub fn new(settings: ReviewSettings) -> Self {
        Self { settings }
    }

    async fn run(&self, kind: ReviewKind, arguments: &Value) -> Result<String> {
        let directory = arguments
            .get("directory")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("'directory' is required and must be absolute"))?;
        let dir = PathBuf::from(directory);
        if !dir.is_absolute() {
            anyhow::bail!("'directory' must be an absolute path, got {directory}");
        }

        let model = arguments
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.settings.model)
            .to_string();
        if !SUPPORTED_MODELS.contains(&model.as_str()) {
            anyhow::bail!(
                "Unsupported model {model}; expected one of {}",
                SUPPORTED_MODELS.join(", ")
            );
        }

        let focus = arguments
            .get("focus")
            .and_then(|v| v.as_array())
            .map(|areas| {
                areas
                    .iter()
                    .filter_map(|a| a.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let mut settings = self.settings.clone();
        settings.model = model.clone();
        let client = GeminiClient::new(model)?;
        let report = warden_review::run_review_with_client(
            &dir,
            kind,
            &ReviewOptions { focus },
            &settings,
            &client,
        )
        .await?;
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

#[async_trait]
impl ToolProvider for ReviewProvider {
    fn server_name(&self) -> &str {
        "warden-code-review"
    }

    fn tools(&self) -> Vec<ToolDef> {
        let schema = json!({
            "type": "object",
            "properties": {
                "directory": {"type": "string", "description": "Absolute directory to review"},
                "focus": {"type": "array", "items": {"type": "string"}},
                "model": {"type": "string", "enum": SUPPORTED_MODELS}
            },
            "required": ["directory"]
        });
        vec![
            ToolDef {
                name: "review_code".to_string(),
                description: "Full review of a directory: correctness, security, \
                              maintainability; returns a report plus token usage."
                    .to_string(),
                input_schema: schema.clone(),
            },
            ToolDef {
                name: "find_bugs".to_string(),
                description: "Defect hunt over a directory; reports only concrete \
                              bugs with failure scenarios."
                    .to_string(),
                input_schema: schema,
            },
        ]
    }

    async fn call(&self, name: &str, arguments: &Value) -> Result<String> {
        match name {
            "review_code" => self.run(ReviewKind::General, arguments).await,
            "find_bugs" => self.run(ReviewKind::BugHunt, arguments).await,
            other => anyhow::bail!("Unknown tool: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn relative_directory_is_rejected() {
        let provider = ReviewProvider::new(ReviewSettings::default());
        let err = provider
            .call("review_code", &json!({"directory": "src"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[tokio::test]
    async fn unsupported_model_is_rejected() {
        let provider = ReviewProvider::new(ReviewSettings::default());
        let err = provider
            .call(
                "review_code",
                &json!({"directory": "/tmp", "model": "gpt-nonexistent"}),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported model"));
    }

    #[tokio::test]
    async fn manifest_has_two_tools() {
        let provider = ReviewProvider::new(ReviewSettings::default());
        let names: Vec<String> = provider.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["review_code", "find_bugs"]);
    }
}
