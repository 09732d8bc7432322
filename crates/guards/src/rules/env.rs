use anyhow::Result;
use async_trait::async_trait;

use crate::guard::{render_refusal, Guard, GuardContext};
use crate::patterns;

/// Blocks setting environment variables whose names read as enforcement
/// bypass switches (SKIP_*, *_DISABLE, BYPASS_*, NO_*, FORCE_PASS, ...) with
/// truthy values, in any of the export/set/env/inline spellings.
pub struct EnvBypassGuard;

#[async_trait]
impl Guard for EnvBypassGuard {
    fn name(&self) -> &'static str {
        "env_bypass"
    }

    fn description(&self) -> &'static str {
        "Blocks attempts to set environment variables that disable tests or guards"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(!patterns::bypass_assignments(&ctx.request.command).is_empty())
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        let assignments = patterns::bypass_assignments(&ctx.request.command);
        let listed = assignments.join(", ");
        render_refusal(
            self.name(),
            &listed,
            "Environment bypass attempt detected. Guards and tests exist to prevent \
             production issues; switching them off does not make the failure go away.",
            "Fix the underlying issue instead of disabling the check that found it.",
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::normalize;

    async fn triggers(command: &str) -> bool {
        let request = normalize(&format!(
            r#"{{"tool_name":"Bash","tool_input":{{"command":{}}}}}"#,
            serde_json::to_string(command).unwrap()
        ))
        .unwrap();
        let mut ctx = GuardContext::new(&request);
        EnvBypassGuard.should_trigger(&mut ctx).await.unwrap()
    }

    #[tokio::test]
    async fn export_and_inline_forms_trigger() {
        assert!(triggers("export SKIP_TESTS=1").await);
        assert!(triggers("SKIP_TESTS=1 pytest").await);
        assert!(triggers("env BYPASS_GUARDS=true some_command").await);
        assert!(triggers("set DISABLE_GUARDS=true").await);
        assert!(triggers("cd /tmp && export SKIP_GUARDS=1 && python test.py").await);
        assert!(triggers("DEBUG=1 SKIP_TESTS=1 python test.py").await);
        assert!(triggers("FORCE_PASS=1 cargo test").await);
    }

    #[tokio::test]
    async fn reads_and_normal_vars_do_not_trigger() {
        assert!(!triggers("echo $SKIP_TESTS").await);
        assert!(!triggers("unset SKIP_GUARDS").await);
        assert!(!triggers("printenv SKIP_GUARDS").await);
        assert!(!triggers("export PATH=/usr/local/bin:$PATH").await);
        assert!(!triggers("export TEST_MODE=1").await);
        assert!(!triggers("DEBUG=1 python test.py").await);
        assert!(!triggers("export API_KEY=secret123").await);
    }

    #[tokio::test]
    async fn message_lists_offending_assignment() {
        let request = normalize(
            r#"{"tool_name":"Bash","tool_input":{"command":"SKIP_TESTS=1 pytest"}}"#,
        )
        .unwrap();
        let mut ctx = GuardContext::new(&request);
        let guard = EnvBypassGuard;
        assert!(guard.should_trigger(&mut ctx).await.unwrap());
        let msg = guard.message(&ctx);
        assert!(msg.contains("SKIP_TESTS=1"));
        assert!(msg.contains("env_bypass"));
    }
}
