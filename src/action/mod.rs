//! Running the external action a directive asks for.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ActionSettings;
use crate::error::SkillError;
use crate::types::ActionOutcome;
use crate::util::text::truncate_utf8;
use crate::util::timeout::with_timeout;

const OUTPUT_MAX_BYTES: usize = 65_536;

/// Runs one action for a directive payload.
///
/// Implementations never fail: problems are reported as an outcome with
/// [`ActionStatus::Error`](crate::types::ActionStatus::Error) so the model can
/// respond to them.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn run(&self, directive: &str) -> ActionOutcome;
}

/// Executes the skill's script as a child process.
///
/// The directive text is passed as the only argument (no shell involved),
/// the working directory is the skill directory, and stdout is the result.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    working_dir: PathBuf,
    script: PathBuf,
    interpreter: String,
    timeout: Duration,
}

impl ScriptExecutor {
    /// Executor for `<skill_dir>/scripts/main.py` with default settings.
    pub fn new(skill_dir: impl Into<PathBuf>) -> Self {
        Self::from_settings(skill_dir, &ActionSettings::default())
    }

    pub fn from_settings(skill_dir: impl Into<PathBuf>, settings: &ActionSettings) -> Self {
        let working_dir = skill_dir.into();
        Self {
            script: working_dir.join(&settings.script),
            working_dir,
            interpreter: settings.interpreter.clone(),
            timeout: settings.timeout(),
        }
    }

    pub fn script_path(&self) -> &Path {
        &self.script
    }

    async fn invoke(&self, directive: &str) -> Result<String, SkillError> {
        if !tokio::fs::try_exists(&self.script).await.unwrap_or(false) {
            return Err(SkillError::Action(format!(
                "Script not found: {}",
                self.script.display()
            )));
        }

        let mut command = tokio::process::Command::new(&self.interpreter);
        command
            .arg(&self.script)
            .arg(directive)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = with_timeout(self.timeout, async {
            command.output().await.map_err(|e| {
                SkillError::Action(format!("failed to start {}: {e}", self.interpreter))
            })
        })
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SkillError::Action(format!(
                "Command failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.len() > OUTPUT_MAX_BYTES {
            let mut truncated = truncate_utf8(&stdout, OUTPUT_MAX_BYTES);
            truncated.push_str("\n... (truncated)");
            return Ok(truncated);
        }
        Ok(stdout.into_owned())
    }
}

#[async_trait]
impl ActionExecutor for ScriptExecutor {
    async fn run(&self, directive: &str) -> ActionOutcome {
        tracing::debug!(script = %self.script.display(), directive, "running action script");
        match self.invoke(directive).await {
            Ok(stdout) => ActionOutcome::success(stdout),
            Err(err) => {
                let message = match err {
                    SkillError::Action(message) => message,
                    other => other.to_string(),
                };
                tracing::warn!(script = %self.script.display(), error = %message, "action script failed");
                ActionOutcome::error(message)
            }
        }
    }
}
