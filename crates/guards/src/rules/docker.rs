use anyhow::Result;
use async_trait::async_trait;

use crate::guard::{render_refusal, Guard, GuardContext};
use crate::patterns;

/// Blocks container restarts. Restarting hides the real failure and loses
/// the in-container state needed to diagnose it.
pub struct DockerRestartGuard;

#[async_trait]
impl Guard for DockerRestartGuard {
    fn name(&self) -> &'static str {
        "docker_restart"
    }

    fn description(&self) -> &'static str {
        "Blocks docker restart in any of its spellings"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(patterns::is_docker_restart(&ctx.request.command))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        render_refusal(
            self.name(),
            &ctx.request.command,
            "Restarting a container papers over whatever made it unhealthy and \
             throws away the evidence.",
            "Read the logs first (`docker compose logs <service>`), fix the cause, \
             then bring the service up through compose.",
            true,
        )
    }
}

/// Blocks raw `docker` lifecycle commands outside compose. Read-only
/// operations (ps, logs, exec, images, system, info, version, help) pass.
pub struct DockerWithoutComposeGuard;

#[async_trait]
impl Guard for DockerWithoutComposeGuard {
    fn name(&self) -> &'static str {
        "docker_without_compose"
    }

    fn description(&self) -> &'static str {
        "Blocks ad-hoc docker lifecycle commands outside compose"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(patterns::is_docker_without_compose(&ctx.request.command))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        render_refusal(
            self.name(),
            &ctx.request.command,
            "Containers managed by compose must stay under compose; ad-hoc docker \
             commands drift the running state away from the service definition.",
            "Express the operation through `docker compose ...` so the compose file \
             stays the single source of truth.",
            true,
        )
    }
}
