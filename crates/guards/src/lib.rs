pub mod audit;
pub mod duplicate;
pub mod guard;
pub mod interaction;
pub mod override_auth;
pub mod patterns;
pub mod registry;
pub mod request;
pub mod rules;

use std::sync::Arc;

use warden_config::Config;
use warden_index::{HttpEmbedder, QdrantClient};

pub use guard::{Decision, Guard, GuardAction, GuardContext};
pub use override_auth::OverrideAuthenticator;
pub use registry::{GuardRegistry, ALL_TOOLS};
pub use request::{normalize, InputError, Request, ToolKind};

/// Build the full guard catalog in its canonical order. Construction never
/// reads user input; the registry is immutable afterwards.
///
/// Dangerous and fail-closed rules are registered first so their refusals win
/// the short-circuit; advisory rules follow; the duplicate gate runs last
/// because it is the only one that leaves the process.
pub fn build_registry(cfg: &Config) -> GuardRegistry {
    let mut registry = GuardRegistry::new();
    let disabled = &cfg.guards.disabled;

    let mut register = |registry: &mut GuardRegistry, guard: Arc<dyn Guard>, tools: &[&str]| {
        let skippable = !guard.fail_closed();
        if skippable && disabled.iter().any(|d| d == guard.name()) {
            tracing::debug!(guard = guard.name(), "Disabled by configuration");
            return;
        }
        registry.register(guard, tools);
    };

    // Installation integrity first; these also fail closed.
    register(
        &mut registry,
        Arc::new(rules::InstallationSafetyGuard),
        &["Bash", "Write", "Edit", "MultiEdit"],
    );
    register(
        &mut registry,
        Arc::new(rules::GitHookProtectionGuard),
        &["Bash"],
    );
    register(
        &mut registry,
        Arc::new(rules::InstallScriptGuard),
        &["Bash", "Write", "Edit", "MultiEdit"],
    );

    // Shell-destruction and version-control discipline.
    register(&mut registry, Arc::new(rules::DangerousCommandGuard), &["Bash"]);
    register(&mut registry, Arc::new(rules::GitNoVerifyGuard), &["Bash"]);
    register(&mut registry, Arc::new(rules::GitForcePushGuard), &["Bash"]);
    register(&mut registry, Arc::new(rules::GitCheckoutSafetyGuard), &["Bash"]);

    // Containers.
    register(&mut registry, Arc::new(rules::DockerRestartGuard), &["Bash"]);
    register(
        &mut registry,
        Arc::new(rules::DockerWithoutComposeGuard),
        &["Bash"],
    );

    // Environment and interpreter hygiene.
    register(&mut registry, Arc::new(rules::EnvBypassGuard), &["Bash"]);
    register(&mut registry, Arc::new(rules::PipInstallGuard), &["Bash"]);
    register(&mut registry, Arc::new(rules::PythonVenvGuard), &["Bash"]);

    // Advisory shell rules.
    register(
        &mut registry,
        Arc::new(rules::DirectoryAwarenessGuard),
        &["Bash"],
    );
    register(&mut registry, Arc::new(rules::RelativeCdGuard), &["Bash"]);
    register(&mut registry, Arc::new(rules::CurlHeadGuard), &["Bash"]);
    register(&mut registry, Arc::new(rules::FalseSuccessGuard), &["Bash"]);
    register(&mut registry, Arc::new(rules::SqlInShellGuard), &["Bash"]);

    // File-content rules.
    register(
        &mut registry,
        Arc::new(rules::MockCodeGuard),
        &["Write", "Edit", "MultiEdit"],
    );
    register(
        &mut registry,
        Arc::new(rules::TestBypassGuard),
        &["Write", "Edit", "MultiEdit"],
    );
    register(
        &mut registry,
        Arc::new(rules::PreCommitConfigGuard),
        &["Write", "Edit", "MultiEdit"],
    );
    register(
        &mut registry,
        Arc::new(rules::SecretLeakGuard),
        &["Write", "Edit", "MultiEdit"],
    );
    register(
        &mut registry,
        Arc::new(rules::TempFileLocationGuard),
        &["Write"],
    );
    register(
        &mut registry,
        Arc::new(rules::ContainerRebuildReminder),
        &["Write", "Edit", "MultiEdit"],
    );
    register(
        &mut registry,
        Arc::new(rules::SchemaChangeReminder),
        &["Write", "Edit", "MultiEdit"],
    );

    // Duplicate prevention last: it is the only guard with external calls.
    if cfg.duplicate.enabled && !disabled.iter().any(|d| d == "duplicate_prevention") {
        let embedder = Arc::new(HttpEmbedder::new(
            cfg.duplicate.embedding_url(),
            cfg.duplicate.embedding_dimension,
        ));
        let store = Arc::new(QdrantClient::new(cfg.duplicate.qdrant_url()));
        register(
            &mut registry,
            Arc::new(duplicate::DuplicatePreventionGuard::new(
                embedder,
                store,
                cfg.duplicate.clone(),
            )),
            &["Write", "Edit", "MultiEdit"],
        );
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_builds_full_catalog() {
        let registry = build_registry(&Config::default());
        assert!(registry.len() >= 24);
    }

    #[test]
    fn disabled_guards_are_skipped() {
        let mut cfg = Config::default();
        cfg.guards.disabled = vec!["sql_in_shell".to_string(), "curl_head".to_string()];
        let with_disabled = build_registry(&cfg);
        let full = build_registry(&Config::default());
        assert_eq!(full.len() - 2, with_disabled.len());
    }

    #[test]
    fn fail_closed_guards_cannot_be_disabled() {
        let mut cfg = Config::default();
        cfg.guards.disabled = vec![
            "installation_safety".to_string(),
            "git_hook_protection".to_string(),
        ];
        let registry = build_registry(&cfg);
        let full = build_registry(&Config::default());
        assert_eq!(registry.len(), full.len());
    }
}
