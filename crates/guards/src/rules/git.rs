use anyhow::Result;
use async_trait::async_trait;

use crate::guard::{render_refusal, Guard, GuardAction, GuardContext};
use crate::patterns;

/// Blocks `git commit --no-verify`, the canonical hook bypass.
pub struct GitNoVerifyGuard;

#[async_trait]
impl Guard for GitNoVerifyGuard {
    fn name(&self) -> &'static str {
        "git_no_verify"
    }

    fn description(&self) -> &'static str {
        "Blocks commits that skip pre-commit verification"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(patterns::GIT_NO_VERIFY.is_match(&ctx.request.command))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        let excerpt = patterns::first_match(&ctx.request.command, &patterns::GIT_NO_VERIFY)
            .unwrap_or(&ctx.request.command);
        render_refusal(
            self.name(),
            excerpt,
            "Pre-commit hooks are the last line of defense against broken commits. \
             Skipping them with --no-verify has shipped failing code before.",
            "Run the commit without --no-verify and fix whatever the hooks report.",
            true,
        )
    }
}

/// Blocks force pushes that can rewrite shared history. The lease-protected
/// form is allowed.
pub struct GitForcePushGuard;

#[async_trait]
impl Guard for GitForcePushGuard {
    fn name(&self) -> &'static str {
        "git_force_push"
    }

    fn description(&self) -> &'static str {
        "Blocks git push --force / -f without --force-with-lease"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(patterns::is_force_push(&ctx.request.command))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        render_refusal(
            self.name(),
            &ctx.request.command,
            "A plain force push can discard commits other people have already \
             pulled or pushed.",
            "Use `git push --force-with-lease`, which refuses when the remote \
             moved underneath you.",
            true,
        )
    }
}

/// Warns on history-moving commands that can silently discard uncommitted
/// work. Advisory only; these are routine but worth a reminder.
pub struct GitCheckoutSafetyGuard;

#[async_trait]
impl Guard for GitCheckoutSafetyGuard {
    fn name(&self) -> &'static str {
        "git_checkout_safety"
    }

    fn description(&self) -> &'static str {
        "Warns before checkout/switch/restore/reset which can drop local changes"
    }

    fn default_action(&self) -> GuardAction {
        GuardAction::Allow
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(patterns::GIT_CHECKOUT.is_match(&ctx.request.command))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        let excerpt = patterns::first_match(&ctx.request.command, &patterns::GIT_CHECKOUT)
            .unwrap_or(&ctx.request.command);
        format!(
            "[{}] `{excerpt}` can discard uncommitted work. Check `git status` \
             first and prefer `git stash` if anything is in flight.",
            self.name()
        )
    }
}

/// Blocks tampering with the repository's hook machinery: deleting or
/// rewriting `.git/hooks`, repointing `core.hooksPath`, or uninstalling
/// pre-commit. Fail-closed: this rule protects the enforcement layer itself.
pub struct GitHookProtectionGuard;

#[async_trait]
impl Guard for GitHookProtectionGuard {
    fn name(&self) -> &'static str {
        "git_hook_protection"
    }

    fn description(&self) -> &'static str {
        "Blocks modification or disabling of git hooks"
    }

    fn fail_closed(&self) -> bool {
        true
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(patterns::matches_any(
            &ctx.request.command,
            &patterns::GIT_HOOK_TAMPER,
        ))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        let excerpt = patterns::GIT_HOOK_TAMPER
            .iter()
            .find_map(|re| patterns::first_match(&ctx.request.command, re))
            .unwrap_or(&ctx.request.command);
        render_refusal(
            self.name(),
            excerpt,
            "Git hooks enforce the project's verification policy. Disabling or \
             moving them defeats every other guard.",
            "Leave the hooks in place and fix the underlying failure they report.",
            false,
        )
    }
}
