//! Command runner abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Runs the command behind an operation.
///
/// Implementations report command-level failure through
/// [`CommandOutput::success`]; an `Err` means the command could not be run
/// at all. Both are treated as a failed operation by the executor.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Get runner name.
    fn name(&self) -> &str;

    /// Run one command.
    async fn run_command(&self, command: &str) -> Result<CommandOutput, anyhow::Error>;
}

/// Output from a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Captured output
    pub output: String,

    /// Whether the command succeeded
    pub success: bool,

    /// Energy cost, when the runner can measure it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_cost: Option<f64>,
}

impl CommandOutput {
    /// Successful output.
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
            energy_cost: None,
        }
    }

    /// Failed output.
    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: false,
            energy_cost: None,
        }
    }

    /// Attach a measured energy cost.
    pub fn with_energy_cost(mut self, cost: f64) -> Self {
        self.energy_cost = Some(cost);
        self
    }
}
