//! Oracle abstraction for plan generation.
//!
//! The [`PlanOracle`] trait decouples the lifecycle from the actual planner
//! backend (currently a local model behind a command). Tests use scripted
//! oracles that return predetermined text without spawning processes.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::run_log::RunLog;
use crate::io::process::run_command_with_timeout;
use crate::io::prompt::render_propose_prompt;
use crate::tool::ToolSpec;

/// Parameters for one plan request.
#[derive(Debug)]
pub struct ProposeRequest<'a> {
    /// Natural-language objective for the run.
    pub goal: &'a str,
    /// 1-indexed attempt this request plans for.
    pub attempt: u32,
    /// Tool catalog the plan may draw from.
    pub tools: Vec<&'a ToolSpec>,
    /// Feedback from earlier attempts; empty on the first.
    pub log: &'a RunLog,
    /// Maximum time to wait for the oracle.
    pub timeout: Duration,
    /// Truncate oracle stdout beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// Abstraction over plan generation backends.
pub trait PlanOracle {
    /// Produce raw planner output for the request.
    ///
    /// The returned text is untrusted; payload extraction happens downstream
    /// and failures there feed back into the next request via the run log.
    fn propose(&self, request: &ProposeRequest<'_>) -> Result<String>;
}

/// Oracle that feeds the rendered prompt to a command on stdin.
pub struct CommandOracle {
    command: Vec<String>,
}

impl CommandOracle {
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.is_empty() || command[0].trim().is_empty() {
            return Err(anyhow!("oracle command must be a non-empty argv"));
        }
        Ok(Self { command })
    }
}

impl PlanOracle for CommandOracle {
    #[instrument(skip_all, fields(attempt = request.attempt, timeout_secs = request.timeout.as_secs()))]
    fn propose(&self, request: &ProposeRequest<'_>) -> Result<String> {
        let prompt = render_propose_prompt(request.goal, &request.tools, request.log)?;
        info!(command = %self.command[0], prompt_bytes = prompt.len(), "requesting plan");

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            request.timeout,
            request.output_limit_bytes,
        )
        .context("run oracle command")?;

        if output.timed_out {
            warn!(timeout_secs = request.timeout.as_secs(), "oracle timed out");
            return Err(anyhow!("oracle timed out after {:?}", request.timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "oracle command failed");
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet = stderr.lines().find(|line| !line.trim().is_empty());
            return Err(match snippet {
                Some(line) => anyhow!(
                    "oracle exited with status {:?}: {}",
                    output.status.code(),
                    line.trim()
                ),
                None => anyhow!("oracle exited with status {:?}", output.status.code()),
            });
        }

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        stdout.push_str(&output.stdout_truncated_notice());
        if stdout.trim().is_empty() {
            return Err(anyhow!("oracle produced no output"));
        }
        debug!(output_bytes = stdout.len(), "oracle replied");
        Ok(stdout)
    }
}
