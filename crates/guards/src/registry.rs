use std::sync::Arc;

use crate::guard::{Decision, Guard, GuardAction, GuardContext};
use crate::interaction;
use crate::override_auth::OverrideAuthenticator;
use crate::request::Request;

/// Sentinel tool name binding a guard to every tool variant.
pub const ALL_TOOLS: &str = "*";

struct Registration {
    tools: Vec<String>,
    guard: Arc<dyn Guard>,
}

/// Ordered multimap from tool name to guards. Built once at process start;
/// evaluation walks the applicable guards in registration order and stops at
/// the first blocking decision, which has already produced a complete
/// refusal.
#[derive(Default)]
pub struct GuardRegistry {
    registrations: Vec<Registration>,
}

impl GuardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, guard: Arc<dyn Guard>, tools: &[&str]) {
        self.registrations.push(Registration {
            tools: tools.iter().map(|t| t.to_string()).collect(),
            guard,
        });
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Wildcard registrations first, then the tool-specific list, each in
    /// registration order.
    fn applicable(&self, tool_name: &str) -> Vec<Arc<dyn Guard>> {
        let mut guards = Vec::new();
        for reg in &self.registrations {
            if reg.tools.iter().any(|t| t == ALL_TOOLS) {
                guards.push(reg.guard.clone());
            }
        }
        for reg in &self.registrations {
            if reg.tools.iter().any(|t| t == tool_name) {
                guards.push(reg.guard.clone());
            }
        }
        guards
    }

    /// Evaluate every applicable guard against one request. Total: every
    /// (tool, request) pair yields exactly one decision.
    pub async fn evaluate(
        &self,
        request: &Request,
        interactive: bool,
        overrides: &OverrideAuthenticator,
    ) -> Decision {
        let mut messages: Vec<String> = Vec::new();

        for guard in self.applicable(request.tool.as_str()) {
            let mut ctx = GuardContext::new(request);

            let triggered = match guard.should_trigger(&mut ctx).await {
                Ok(t) => t,
                Err(e) => {
                    if guard.fail_closed() {
                        messages.push(format!(
                            "[{}] internal error ({e}); this guard protects installation \
                             integrity and refuses on error.",
                            guard.name()
                        ));
                        return Decision::refuse(messages);
                    }
                    tracing::warn!(guard = guard.name(), error = %e, "Guard failed; admitting");
                    messages.push(format!(
                        "[{}] could not evaluate ({e}); continuing without it.",
                        guard.name()
                    ));
                    continue;
                }
            };
            if !triggered {
                continue;
            }

            let message = guard.message(&ctx);
            match guard.default_action() {
                GuardAction::Allow => {
                    messages.push(message);
                }
                GuardAction::Block => {
                    if overrides.try_consume(guard.name()) {
                        messages.push(format!(
                            "[{}] override accepted; allowing this action once.",
                            guard.name()
                        ));
                        continue;
                    }
                    if interactive {
                        if interaction::ask_permission(&message, false) {
                            crate::audit::append(
                                overrides.log_dir(),
                                "interactive_approvals.log",
                                &format!("user approved guard '{}'", guard.name()),
                            );
                            continue;
                        }
                        messages.push(message);
                        return Decision::refuse(messages);
                    }
                    messages.push(message);
                    return Decision::refuse(messages);
                }
            }
        }

        Decision::admit(messages)
    }
}
