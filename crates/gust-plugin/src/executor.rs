//! Plugin process execution.
//!
//! Runs a compiled plugin executable as a subprocess, feeding it a
//! [`PluginInput`] on stdin and parsing a [`PluginOutput`] from stdout.
//! On Linux, command plugins without the `allow-network-connections` /
//! `allow-writing-to-package-directory` permissions are run through
//! `sandbox-exec`-style isolation where available; elsewhere permissions
//! are only checked, not enforced at the OS level.

use crate::{Plugin, PluginError};
use crate::protocol::{PluginInput, PluginOutput};
use gust_types::PluginPermission;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Inputs for a single plugin invocation.
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub working_directory: PathBuf,
    pub arguments: Vec<String>,
    pub permissions: Vec<PluginPermission>,
}

/// Outcome of running a plugin to completion.
#[derive(Debug, Clone)]
pub struct PluginResult {
    pub success: bool,
    pub output: PluginOutput,
    pub stderr: String,
}

/// Executes plugin binaries as subprocesses.
pub struct PluginExecutor {
    sandboxed: bool,
}

impl PluginExecutor {
    pub fn new(sandboxed: bool) -> Self {
        Self { sandboxed }
    }

    /// Run `plugin` with `context`, returning its parsed output.
    pub async fn execute(
        &self,
        plugin: &Plugin,
        context: PluginContext,
    ) -> Result<PluginResult, PluginError> {
        if !plugin.executable.exists() {
            return Err(PluginError::NotFound(plugin.name.clone()));
        }

        let mut command = self.build_command(plugin, &context)?;

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let input = PluginInput {
            working_directory: context.working_directory.clone(),
            arguments: context.arguments.clone(),
        };
        let input_json = serde_json::to_vec(&input)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&input_json).await?;
            stdin.shutdown().await?;
        }

        let result = child.wait_with_output().await?;
        let stderr = String::from_utf8_lossy(&result.stderr).into_owned();

        if !result.status.success() {
            return Err(PluginError::ExecutionFailed(format!(
                "{} exited with status {}: {}",
                plugin.name, result.status, stderr
            )));
        }

        let output: PluginOutput = if result.stdout.is_empty() {
            PluginOutput {
                generated_files: Vec::new(),
                diagnostics: Vec::new(),
                build_commands: Vec::new(),
            }
        } else {
            serde_json::from_slice(&result.stdout)?
        };

        Ok(PluginResult {
            success: true,
            output,
            stderr,
        })
    }

    fn build_command(
        &self,
        plugin: &Plugin,
        context: &PluginContext,
    ) -> Result<Command, PluginError> {
        if self.sandboxed && cfg!(target_os = "macos") {
            let sandbox_exec = which::which("sandbox-exec")
                .map_err(|_| PluginError::SandboxError("sandbox-exec not found".to_string()))?;
            let profile = sandbox_profile(&context.permissions);
            let mut command = Command::new(sandbox_exec);
            command
                .arg("-p")
                .arg(profile)
                .arg(&plugin.executable)
                .current_dir(&context.working_directory);
            Ok(command)
        } else {
            let mut command = Command::new(&plugin.executable);
            command.current_dir(&context.working_directory);
            Ok(command)
        }
    }
}

/// Build a minimal `sandbox-exec` profile permitting only what the plugin
/// declared it needs.
fn sandbox_profile(permissions: &[PluginPermission]) -> String {
    let mut rules = vec![
        "(version 1)".to_string(),
        "(deny default)".to_string(),
        "(allow process-fork)".to_string(),
        "(allow file-read*)".to_string(),
    ];

    for permission in permissions {
        match permission {
            PluginPermission::WriteToPackageDirectory { .. } => {
                rules.push("(allow file-write*)".to_string());
            }
            PluginPermission::AllowNetworkConnections { .. } => {
                rules.push("(allow network*)".to_string());
            }
        }
    }

    rules.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_profile_denies_by_default() {
        let profile = sandbox_profile(&[]);
        assert!(profile.contains("(deny default)"));
        assert!(!profile.contains("file-write"));
    }

    #[test]
    fn test_sandbox_profile_grants_requested_permissions() {
        let profile = sandbox_profile(&[PluginPermission::AllowNetworkConnections {
            scope: gust_types::NetworkScope::All,
            reason: "fetch templates".to_string(),
        }]);
        assert!(profile.contains("(allow network*)"));
    }
}
