use anyhow::Result;
use async_trait::async_trait;

use crate::guard::{render_refusal, Guard, GuardContext};
use crate::patterns;
use crate::request::ToolKind;

const READ_ONLY_PREFIXES: &[&str] = &["ls ", "cat ", "head ", "tail ", "grep ", "find "];

/// Blocks any write into the host assistant's installation directory and the
/// destructive shell operations against it. Only the sanctioned installer
/// touches that tree; everything else loses the installed hooks. Fail-closed:
/// this rule protects the enforcement layer's own integrity.
pub struct InstallationSafetyGuard;

impl InstallationSafetyGuard {
    fn bash_triggers(command: &str) -> bool {
        if patterns::matches_any(command, &patterns::ASSISTANT_DIR_DESTRUCTIVE) {
            return true;
        }
        if !patterns::ASSISTANT_DIR.is_match(command) {
            return false;
        }
        if READ_ONLY_PREFIXES
            .iter()
            .any(|p| command.trim_start().starts_with(p))
        {
            return false;
        }
        ["rm ", "mv ", "cp ", "chmod ", ">", ">>"]
            .iter()
            .any(|op| command.contains(op))
    }
}

#[async_trait]
impl Guard for InstallationSafetyGuard {
    fn name(&self) -> &'static str {
        "installation_safety"
    }

    fn description(&self) -> &'static str {
        "Blocks modifications to the assistant installation directory"
    }

    fn fail_closed(&self) -> bool {
        true
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        let req = ctx.request;
        match req.tool {
            ToolKind::Bash => Ok(Self::bash_triggers(&req.command)),
            ToolKind::Write | ToolKind::Edit | ToolKind::MultiEdit => {
                Ok(patterns::ASSISTANT_DIR.is_match(&req.file_path))
            }
            _ => Ok(false),
        }
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        let excerpt = if ctx.request.command.is_empty() {
            ctx.request.file_path.as_str()
        } else {
            ctx.request.command.as_str()
        };
        render_refusal(
            self.name(),
            excerpt,
            "The installation directory holds the hooks and servers that enforce \
             every other rule. Writing into it directly has destroyed working \
             installations before.",
            "Use the sanctioned installer script for any change under the assistant \
             directory, and back up before running it.",
            false,
        )
    }
}

/// Blocks creating or editing ad-hoc install/setup scripts. Installations go
/// through the one reviewed installer, not a new script per attempt.
pub struct InstallScriptGuard;

impl InstallScriptGuard {
    const SANCTIONED: &'static str = "safe_install.sh";
}

#[async_trait]
impl Guard for InstallScriptGuard {
    fn name(&self) -> &'static str {
        "install_script"
    }

    fn description(&self) -> &'static str {
        "Blocks creation of new install or setup scripts"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        let req = ctx.request;
        match req.tool {
            ToolKind::Bash => Ok(patterns::INSTALL_SCRIPT_REDIRECT.is_match(&req.command)),
            ToolKind::Write | ToolKind::Edit | ToolKind::MultiEdit => {
                Ok(patterns::INSTALL_SCRIPT_NAME.is_match(&req.file_path)
                    && !req.file_path.ends_with(Self::SANCTIONED))
            }
            _ => Ok(false),
        }
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        let excerpt = if ctx.request.command.is_empty() {
            ctx.request.file_path.as_str()
        } else {
            ctx.request.command.as_str()
        };
        render_refusal(
            self.name(),
            excerpt,
            "Each one-off install script is an unreviewed path into the installed \
             tree, and they accumulate.",
            &format!("Extend {} instead of writing a new script.", Self::SANCTIONED),
            true,
        )
    }
}
