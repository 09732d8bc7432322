use anyhow::Result;
use async_trait::async_trait;

use crate::request::Request;

/// Sensitivity tier of a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardAction {
    /// Advisory: the message is surfaced but the action proceeds.
    Allow,
    /// The action is refused unless a human override applies.
    Block,
}

/// A near-duplicate hit recorded by the duplicate-prevention guard.
#[derive(Debug, Clone)]
pub struct SimilarMatch {
    pub file_path: String,
    pub score: f32,
}

/// Transient per-request evaluation state, stack-allocated by the registry.
/// Guards are stateless singletons; anything a guard learns in
/// `should_trigger` that `message` needs again goes here.
pub struct GuardContext<'a> {
    pub request: &'a Request,
    pub similar: Vec<SimilarMatch>,
}

impl<'a> GuardContext<'a> {
    pub fn new(request: &'a Request) -> Self {
        Self {
            request,
            similar: Vec::new(),
        }
    }
}

/// One rule in the catalog. `should_trigger` must be deterministic for a
/// given request; `message` is called at most once, only after a trigger, and
/// must quote a verbatim excerpt of the request.
#[async_trait]
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    fn default_action(&self) -> GuardAction {
        GuardAction::Block
    }

    /// Fail-closed guards refuse when their own evaluation errors. Reserved
    /// for rules protecting the assistant's installation integrity.
    fn fail_closed(&self) -> bool {
        false
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool>;

    fn message(&self, ctx: &GuardContext<'_>) -> String;
}

/// The engine's verdict for one request.
#[derive(Debug, Clone)]
pub struct Decision {
    pub should_block: bool,
    pub exit_code: i32,
    pub messages: Vec<String>,
}

impl Decision {
    pub fn admit(messages: Vec<String>) -> Self {
        Self {
            should_block: false,
            exit_code: 0,
            messages,
        }
    }

    pub fn refuse(messages: Vec<String>) -> Self {
        Self {
            should_block: true,
            exit_code: 2,
            messages,
        }
    }
}

/// Shared message shape so refusals read consistently: what fired, the
/// offending excerpt, why it matters, and what to do instead.
pub fn render_refusal(
    guard_name: &str,
    excerpt: &str,
    rationale: &str,
    remediation: &str,
    overridable: bool,
) -> String {
    let mut msg = format!("[{guard_name}] blocked this action.\n\nMatched: {excerpt}\n\n{rationale}\n\nInstead: {remediation}\n");
    if overridable {
        msg.push_str(
            "\nIf a human operator has explicitly approved this, re-run with\nHOOK_OVERRIDE_CODE=<code from your authenticator> set in the environment.\n",
        );
    }
    msg
}
