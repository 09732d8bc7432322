use anyhow::Result;
use async_trait::async_trait;

use crate::guard::{render_refusal, Guard, GuardAction, GuardContext};
use crate::patterns;
use crate::request::ToolKind;

/// Blocks mock-framework code from entering the tree. Mocks in tests have
/// repeatedly hidden real integration failures.
pub struct MockCodeGuard;

#[async_trait]
impl Guard for MockCodeGuard {
    fn name(&self) -> &'static str {
        "mock_code"
    }

    fn description(&self) -> &'static str {
        "Blocks introduction of mock-framework code"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        let text = ctx.request.incoming_text();
        Ok(!patterns::find_labeled(&text, &patterns::MOCK_CODE).is_empty())
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        let text = ctx.request.incoming_text();
        let found = patterns::find_labeled(&text, &patterns::MOCK_CODE);
        let mut msg = format!(
            "[{}] blocked this write to {}.\n\nDetected mock patterns:\n",
            self.name(),
            ctx.request.file_path
        );
        for (label, excerpt) in &found {
            msg.push_str(&format!("  - {label}: `{excerpt}`\n"));
        }
        msg.push_str(
            "\nMocked tests pass while the real integration is broken. Test against \
             the real dependency; if it is too slow, fix the dependency setup.\n\
             \nIf a human operator has explicitly approved this, re-run with\n\
             HOOK_OVERRIDE_CODE=<code from your authenticator> set in the environment.\n",
        );
        msg
    }
}

/// Blocks markers that weaken test enforcement: skip decorators, manual
/// pre-commit stages, fast-mode flags.
pub struct TestBypassGuard;

#[async_trait]
impl Guard for TestBypassGuard {
    fn name(&self) -> &'static str {
        "test_bypass_markers"
    }

    fn description(&self) -> &'static str {
        "Blocks code patterns that bypass test enforcement"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        let text = ctx.request.incoming_text();
        Ok(!patterns::find_labeled(&text, &patterns::TEST_BYPASS).is_empty())
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        let text = ctx.request.incoming_text();
        let found = patterns::find_labeled(&text, &patterns::TEST_BYPASS);
        let mut msg = format!(
            "[{}] blocked this write to {}.\n\nDetected bypass patterns:\n",
            self.name(),
            ctx.request.file_path
        );
        for (label, excerpt) in &found {
            msg.push_str(&format!("  - {label}: `{excerpt}`\n"));
        }
        msg.push_str(
            "\nEvery test runs every time. Fix slow tests instead of skipping them; \
             a skipped test is a failure nobody sees.\n\
             \nIf a human operator has explicitly approved this, re-run with\n\
             HOOK_OVERRIDE_CODE=<code from your authenticator> set in the environment.\n",
        );
        msg
    }
}

/// Blocks edits to the pre-commit configuration, which defines the
/// verification the no-verify guard protects.
pub struct PreCommitConfigGuard;

#[async_trait]
impl Guard for PreCommitConfigGuard {
    fn name(&self) -> &'static str {
        "precommit_config"
    }

    fn description(&self) -> &'static str {
        "Blocks edits to .pre-commit-config.yaml"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(ctx.request.file_path.ends_with(".pre-commit-config.yaml"))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        render_refusal(
            self.name(),
            &ctx.request.file_path,
            "The pre-commit configuration is the contract for what every commit \
             must pass. Edits here usually aim to loosen it.",
            "Propose the change to a human reviewer; the config is edited by people.",
            true,
        )
    }
}

/// Warns when scratch files (test_*, debug_*, temp_* ...) are written at the
/// repository root instead of a scratch area.
pub struct TempFileLocationGuard;

#[async_trait]
impl Guard for TempFileLocationGuard {
    fn name(&self) -> &'static str {
        "temp_file_location"
    }

    fn description(&self) -> &'static str {
        "Warns when scratch files land outside a scratch directory"
    }

    fn default_action(&self) -> GuardAction {
        GuardAction::Allow
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        if ctx.request.tool != ToolKind::Write {
            return Ok(false);
        }
        let path = std::path::Path::new(&ctx.request.file_path);
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(false);
        };
        if !patterns::TEMP_FILE_PREFIX.is_match(name) {
            return Ok(false);
        }
        // Files under tests/ or tmp-ish directories are where they belong.
        let parent = path.parent().map(|p| p.to_string_lossy().to_string()).unwrap_or_default();
        Ok(!parent.contains("test") && !parent.contains("tmp") && !parent.contains("scratch"))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        format!(
            "[{}] `{}` looks like a scratch file outside a scratch directory. \
             Put throwaway scripts under a tmp/ or scratch/ directory so they \
             do not end up committed.",
            self.name(),
            ctx.request.file_path
        )
    }
}

/// Warns after edits to Dockerfiles or compose files: the running containers
/// no longer match the sources.
pub struct ContainerRebuildReminder;

#[async_trait]
impl Guard for ContainerRebuildReminder {
    fn name(&self) -> &'static str {
        "container_rebuild"
    }

    fn description(&self) -> &'static str {
        "Reminds that container definition edits require a rebuild"
    }

    fn default_action(&self) -> GuardAction {
        GuardAction::Allow
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(patterns::matches_any(
            &ctx.request.file_path,
            &patterns::DOCKER_FILES,
        ))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        format!(
            "[{}] {} defines the container image; the running containers now \
             differ from it. Rebuild with `docker compose up -d --build` when done.",
            self.name(),
            ctx.request.file_path
        )
    }
}

/// Warns on schema and migration edits, which need a coordinated rollout.
pub struct SchemaChangeReminder;

#[async_trait]
impl Guard for SchemaChangeReminder {
    fn name(&self) -> &'static str {
        "schema_change"
    }

    fn description(&self) -> &'static str {
        "Reminds about migration discipline on schema file edits"
    }

    fn default_action(&self) -> GuardAction {
        GuardAction::Allow
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        let path = ctx.request.file_path.to_lowercase();
        Ok(path.ends_with(".sql") || path.contains("/migrations/") || path.contains("schema"))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        format!(
            "[{}] {} touches the database schema. Make sure a migration exists \
             and runs before code that depends on it ships.",
            self.name(),
            ctx.request.file_path
        )
    }
}

/// Warns when the incoming content carries credential-shaped strings.
pub struct SecretLeakGuard;

#[async_trait]
impl Guard for SecretLeakGuard {
    fn name(&self) -> &'static str {
        "secret_leak"
    }

    fn description(&self) -> &'static str {
        "Warns when written content contains credential-shaped strings"
    }

    fn default_action(&self) -> GuardAction {
        GuardAction::Allow
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        let text = ctx.request.incoming_text();
        Ok(!patterns::find_labeled(&text, &patterns::SECRET_SHAPES).is_empty())
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        let text = ctx.request.incoming_text();
        let found = patterns::find_labeled(&text, &patterns::SECRET_SHAPES);
        let labels: Vec<&str> = found.iter().map(|(label, _)| *label).collect();
        format!(
            "[{}] {} appears to contain: {}. Keep credentials in the environment \
             or a secrets manager, never in the tree.",
            self.name(),
            ctx.request.file_path,
            labels.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::normalize;

    fn write(file_path: &str, content: &str) -> crate::request::Request {
        normalize(&format!(
            r#"{{"tool_name":"Write","tool_input":{{"file_path":{},"content":{}}}}}"#,
            serde_json::to_string(file_path).unwrap(),
            serde_json::to_string(content).unwrap()
        ))
        .unwrap()
    }

    fn edit(file_path: &str, new_string: &str) -> crate::request::Request {
        normalize(&format!(
            r#"{{"tool_name":"Edit","tool_input":{{"file_path":{},"old_string":"x","new_string":{}}}}}"#,
            serde_json::to_string(file_path).unwrap(),
            serde_json::to_string(new_string).unwrap()
        ))
        .unwrap()
    }

    async fn triggers(guard: &dyn Guard, request: &crate::request::Request) -> bool {
        let mut ctx = GuardContext::new(request);
        guard.should_trigger(&mut ctx).await.unwrap()
    }

    #[tokio::test]
    async fn mock_code_positive_and_negative() {
        let guard = MockCodeGuard;
        let req = write(
            "/repo/test.py",
            "import unittest.mock\n@mock.patch('s')\ndef t(): pass",
        );
        assert!(triggers(&guard, &req).await);
        let mut ctx = GuardContext::new(&req);
        assert!(guard.should_trigger(&mut ctx).await.unwrap());
        let msg = guard.message(&ctx);
        assert!(msg.contains("mock.patch decorator"));
        assert!(msg.contains("unittest.mock import"));

        assert!(!triggers(&guard, &write("/repo/real.py", "def add(a, b): return a + b")).await);
    }

    #[tokio::test]
    async fn mock_code_in_single_edit_triggers() {
        let guard = MockCodeGuard;
        assert!(triggers(&guard, &edit("/repo/test.py", "m = MagicMock()")).await);
    }

    #[tokio::test]
    async fn pattern_split_across_edits_does_not_trigger() {
        // "@mock." in one edit, "patch" in another: per-edit isolation holds.
        let guard = MockCodeGuard;
        let req = normalize(
            r#"{"tool_name":"MultiEdit","tool_input":{"file_path":"/repo/t.py","edits":[
                {"old_string":"a","new_string":"x = \"@mock.\""},
                {"old_string":"b","new_string":"y = \"patch-level\""}
            ]}}"#,
        )
        .unwrap();
        assert!(!triggers(&guard, &req).await);
    }

    #[tokio::test]
    async fn test_bypass_markers() {
        let guard = TestBypassGuard;
        assert!(triggers(&guard, &write("/repo/t.py", "@pytest.mark.skip\ndef test_x(): pass")).await);
        assert!(triggers(&guard, &write("/repo/.pre-commit-config.yaml", "stages: [manual]")).await);
        assert!(triggers(&guard, &edit("/repo/run.sh", "pytest --fast ")).await);
        assert!(!triggers(&guard, &write("/repo/t.py", "def test_x(): assert f() == 3")).await);
    }

    #[tokio::test]
    async fn precommit_config_path() {
        let guard = PreCommitConfigGuard;
        assert!(triggers(&guard, &edit("/repo/.pre-commit-config.yaml", "repos: []")).await);
        assert!(!triggers(&guard, &edit("/repo/config.yaml", "a: 1")).await);
    }

    #[tokio::test]
    async fn temp_file_location() {
        let guard = TempFileLocationGuard;
        assert!(triggers(&guard, &write("/repo/debug_thing.py", "print(1)")).await);
        assert!(!triggers(&guard, &write("/repo/tests/test_api.py", "def test(): pass")).await);
        assert!(!triggers(&guard, &write("/repo/tmp/debug_thing.py", "print(1)")).await);
        assert!(!triggers(&guard, &write("/repo/main.py", "print(1)")).await);
    }

    #[tokio::test]
    async fn container_rebuild_reminder() {
        let guard = ContainerRebuildReminder;
        assert!(triggers(&guard, &edit("/repo/Dockerfile", "FROM rust:1.80")).await);
        assert!(triggers(&guard, &edit("/repo/docker-compose.dev.yml", "services:")).await);
        assert!(!triggers(&guard, &edit("/repo/src/main.rs", "fn main() {}")).await);
    }

    #[tokio::test]
    async fn schema_change_reminder() {
        let guard = SchemaChangeReminder;
        assert!(triggers(&guard, &edit("/repo/migrations/0003_add_users.sql", "ALTER TABLE")).await);
        assert!(triggers(&guard, &edit("/repo/db/schema.rb", "create_table")).await);
        assert!(!triggers(&guard, &edit("/repo/src/lib.rs", "fn x() {}")).await);
    }

    #[tokio::test]
    async fn secret_leak() {
        let guard = SecretLeakGuard;
        assert!(
            triggers(
                &guard,
                &write("/repo/config.py", "key = AKIAIOSFODNN7EXAMPLE1")
            )
            .await
        );
        assert!(
            !triggers(&guard, &write("/repo/config.py", "key = os.environ['AWS_KEY']")).await
        );
    }
}
