//! External utility invocation.
//!
//! The dump utility, restore utility and template renderer are opaque
//! collaborators whose only observable contract is their exit status. Each
//! invocation is wrapped in a typed result so callers can branch on which
//! tool failed, not just on pass/fail.

use std::fmt;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::config::ToolsConfig;
use crate::error::BootstrapError;

/// The external utilities this entrypoint shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Logical dump of the upstream instance.
    Dump,
    /// Restore of the dump into the local database.
    Restore,
    /// Configuration template renderer.
    Template,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolKind::Dump => "dump",
            ToolKind::Restore => "restore",
            ToolKind::Template => "template",
        };
        f.write_str(name)
    }
}

/// Run a prepared command to completion, blocking the sequence on its exit.
///
/// Spawn failure and non-zero exit are distinct typed errors.
pub async fn run(kind: ToolKind, cmd: &mut Command) -> Result<(), BootstrapError> {
    let program = PathBuf::from(cmd.as_std().get_program());
    debug!(tool = %kind, program = %program.display(), "running external tool");

    let status = cmd.status().await.map_err(|source| BootstrapError::ToolSpawn {
        tool: kind,
        program: program.clone(),
        source,
    })?;

    if !status.success() {
        return Err(BootstrapError::ToolFailed { tool: kind, status });
    }
    Ok(())
}

/// Render a configuration template in place, keeping the template file
/// alongside the rendered output.
pub async fn render_template(tools: &ToolsConfig, template: &Path) -> Result<(), BootstrapError> {
    let mut cmd = Command::new(&tools.template);
    cmd.arg("--keep-template").arg(template);
    run(ToolKind::Template, &mut cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_exit_is_ok() {
        let mut cmd = Command::new("true");
        assert!(run(ToolKind::Template, &mut cmd).await.is_ok());
    }

    #[tokio::test]
    async fn nonzero_exit_is_tool_failed() {
        let mut cmd = Command::new("false");
        let err = run(ToolKind::Dump, &mut cmd).await.unwrap_err();
        match err {
            BootstrapError::ToolFailed { tool, status } => {
                assert_eq!(tool, ToolKind::Dump);
                assert!(!status.success());
            }
            other => panic!("expected ToolFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_tool_spawn() {
        let mut cmd = Command::new("/nonexistent/definitely-not-a-tool");
        let err = run(ToolKind::Restore, &mut cmd).await.unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::ToolSpawn {
                tool: ToolKind::Restore,
                ..
            }
        ));
    }
}
