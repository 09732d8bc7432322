mod docker;
mod env;
mod files;
mod git;
mod install;
mod python;
mod shell;

pub use docker::{DockerRestartGuard, DockerWithoutComposeGuard};
pub use env::EnvBypassGuard;
pub use files::{
    ContainerRebuildReminder, MockCodeGuard, PreCommitConfigGuard, SchemaChangeReminder,
    SecretLeakGuard, TempFileLocationGuard, TestBypassGuard,
};
pub use git::{GitCheckoutSafetyGuard, GitForcePushGuard, GitHookProtectionGuard, GitNoVerifyGuard};
pub use install::{InstallScriptGuard, InstallationSafetyGuard};
pub use python::{PipInstallGuard, PythonVenvGuard};
pub use shell::{
    CurlHeadGuard, DangerousCommandGuard, DirectoryAwarenessGuard, FalseSuccessGuard,
    RelativeCdGuard, SqlInShellGuard,
};
