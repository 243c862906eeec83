//! Built-in command runners (placeholder echo, system shell).

use super::r#trait::*;
use async_trait::async_trait;
use tokio::process::Command;

/// Placeholder runner: succeeds immediately with `Executed: <command>`.
pub struct EchoRunner;

#[async_trait]
impl CommandRunner for EchoRunner {
    fn name(&self) -> &str {
        "echo"
    }

    async fn run_command(&self, command: &str) -> Result<CommandOutput, anyhow::Error> {
        Ok(CommandOutput::ok(format!("Executed: {}", command)))
    }
}

/// Runs commands through `sh -c`.
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    /// Create a runner using `sh`.
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    /// Use a different shell binary.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    fn name(&self) -> &str {
        "shell"
    }

    async fn run_command(&self, command: &str) -> Result<CommandOutput, anyhow::Error> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command).kill_on_drop(true);

        let output = cmd.output().await?;

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        Ok(CommandOutput {
            output: text,
            success: output.status.success(),
            energy_cost: None,
        })
    }
}
