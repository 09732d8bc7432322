use anyhow::Result;
use async_trait::async_trait;

use crate::guard::{render_refusal, Guard, GuardContext};
use crate::patterns;

/// Blocks ad-hoc `pip install <package>`. Sanctioned forms: requirements
/// files, upgrading pip itself, and --user installs.
pub struct PipInstallGuard;

#[async_trait]
impl Guard for PipInstallGuard {
    fn name(&self) -> &'static str {
        "pip_install"
    }

    fn description(&self) -> &'static str {
        "Blocks pip installs that bypass the requirements files"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(patterns::is_direct_pip_install(&ctx.request.command))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        render_refusal(
            self.name(),
            &ctx.request.command,
            "Installing packages directly leaves the requirements files out of date, \
             so the next clean environment breaks.",
            "Add the package to requirements.txt (or requirements-dev.txt) and run \
             `pip install -r requirements.txt`.",
            true,
        )
    }
}

/// Blocks `python` invocations that sidestep the project virtual
/// environment. Version checks, venv creation, and `which python` pass.
pub struct PythonVenvGuard;

#[async_trait]
impl Guard for PythonVenvGuard {
    fn name(&self) -> &'static str {
        "python_venv"
    }

    fn description(&self) -> &'static str {
        "Blocks python runs outside the project virtual environment"
    }

    async fn should_trigger(&self, ctx: &mut GuardContext<'_>) -> Result<bool> {
        Ok(patterns::is_python_outside_venv(&ctx.request.command))
    }

    fn message(&self, ctx: &GuardContext<'_>) -> String {
        render_refusal(
            self.name(),
            &ctx.request.command,
            "The system interpreter does not have the project's dependencies; \
             results from it are meaningless and pollute the global site-packages.",
            "Invoke the project interpreter explicitly, e.g. `./venv/bin/python ...`, \
             or create one with `python -m venv venv` first.",
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::normalize;

    async fn triggers(guard: &dyn Guard, command: &str) -> bool {
        let request = normalize(&format!(
            r#"{{"tool_name":"Bash","tool_input":{{"command":{}}}}}"#,
            serde_json::to_string(command).unwrap()
        ))
        .unwrap();
        let mut ctx = GuardContext::new(&request);
        guard.should_trigger(&mut ctx).await.unwrap()
    }

    #[tokio::test]
    async fn pip_positive_and_negative() {
        let guard = PipInstallGuard;
        assert!(triggers(&guard, "pip install requests").await);
        assert!(triggers(&guard, "pip3 install flask==2.0.1").await);
        assert!(!triggers(&guard, "pip install -r requirements.txt").await);
        assert!(!triggers(&guard, "pip install -r requirements-dev.txt").await);
        assert!(!triggers(&guard, "pip install --upgrade pip").await);
        assert!(!triggers(&guard, "pip install --user cowsay").await);
        assert!(!triggers(&guard, "pip freeze").await);
    }

    #[tokio::test]
    async fn venv_positive_and_negative() {
        let guard = PythonVenvGuard;
        assert!(triggers(&guard, "python script.py").await);
        assert!(triggers(&guard, "python3 -m pytest tests/").await);
        assert!(!triggers(&guard, "./venv/bin/python script.py").await);
        assert!(!triggers(&guard, ".venv/bin/python3 -m pytest").await);
        assert!(!triggers(&guard, "python --version").await);
        assert!(!triggers(&guard, "python -m venv venv").await);
        assert!(!triggers(&guard, "which python").await);
    }
}
