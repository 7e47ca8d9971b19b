//! Builtin tools backing the default registry.
//!
//! `shell_command` and `git_status` go through the bounded subprocess runner;
//! `echo` is pure. All three honor the [`Tool`] contract including effect
//! prediction, so a default run works end to end without custom tooling.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};

use crate::io::process::{CommandOutput, run_command_with_timeout};
use crate::tool::{
    DuplicateToolError, ExitStatus, InvocationLimits, Tool, ToolInputs, ToolOutput, ToolRegistry,
};

/// Runs an arbitrary command line under `sh -c`.
pub struct ShellCommandTool {
    workdir: PathBuf,
}

impl ShellCommandTool {
    pub fn new(workdir: PathBuf) -> Self {
        Self { workdir }
    }
}

impl Tool for ShellCommandTool {
    fn name(&self) -> &str {
        "shell_command"
    }

    fn required_inputs(&self) -> BTreeSet<String> {
        ["command".to_string()].into_iter().collect()
    }

    fn output_schema(&self) -> Option<String> {
        Some("stdout and stderr of the command, plus its exit code".to_string())
    }

    fn execute(&self, inputs: &ToolInputs, limits: &InvocationLimits) -> Result<ToolOutput> {
        let script = require_input(inputs, "command")?;
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script).current_dir(&self.workdir);
        let output = run_command_with_timeout(cmd, None, limits.timeout, limits.output_limit_bytes)
            .context("run shell command")?;
        Ok(to_tool_output(output))
    }

    fn predict(&self, inputs: &ToolInputs) -> Result<String> {
        let script = require_input(inputs, "command")?;
        Ok(format!("runs `{script}` in a shell; effects depend on the command"))
    }
}

/// Read-only repository status via `git status --short --branch`.
pub struct GitStatusTool {
    workdir: PathBuf,
}

impl GitStatusTool {
    pub fn new(workdir: PathBuf) -> Self {
        Self { workdir }
    }
}

impl Tool for GitStatusTool {
    fn name(&self) -> &str {
        "git_status"
    }

    fn required_inputs(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn output_schema(&self) -> Option<String> {
        Some("porcelain status lines, one per changed file".to_string())
    }

    fn execute(&self, _inputs: &ToolInputs, limits: &InvocationLimits) -> Result<ToolOutput> {
        let mut cmd = Command::new("git");
        cmd.args(["status", "--short", "--branch"])
            .current_dir(&self.workdir);
        let output = run_command_with_timeout(cmd, None, limits.timeout, limits.output_limit_bytes)
            .context("run git status")?;
        Ok(to_tool_output(output))
    }

    fn predict(&self, _inputs: &ToolInputs) -> Result<String> {
        Ok("reads repository status; no files are modified".to_string())
    }
}

/// Prints its input back; useful for plans that only need to report.
pub struct EchoTool;

impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn required_inputs(&self) -> BTreeSet<String> {
        ["text".to_string()].into_iter().collect()
    }

    fn execute(&self, inputs: &ToolInputs, _limits: &InvocationLimits) -> Result<ToolOutput> {
        let text = require_input(inputs, "text")?;
        Ok(ToolOutput {
            exit_status: ExitStatus::Code(0),
            stdout: format!("{text}\n"),
            stderr: String::new(),
            timed_out: false,
        })
    }

    fn predict(&self, inputs: &ToolInputs) -> Result<String> {
        let text = require_input(inputs, "text")?;
        Ok(format!("prints `{text}` to stdout"))
    }
}

/// Registry with the builtin tools, rooted at `root` for subprocess work.
pub fn default_registry(root: &Path) -> Result<ToolRegistry, DuplicateToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ShellCommandTool::new(root.to_path_buf())))?;
    registry.register(Box::new(GitStatusTool::new(root.to_path_buf())))?;
    registry.register(Box::new(EchoTool))?;
    Ok(registry)
}

/// Fetch a required input, rejecting absent or blank values.
///
/// Validation checks the same condition upstream; this guards direct library
/// callers that skip it.
fn require_input<'a>(inputs: &'a ToolInputs, key: &str) -> Result<&'a str> {
    inputs
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| anyhow!("missing required input `{key}`"))
}

fn to_tool_output(output: CommandOutput) -> ToolOutput {
    let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    stdout.push_str(&output.stdout_truncated_notice());
    let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    stderr.push_str(&output.stderr_truncated_notice());
    ToolOutput {
        exit_status: output.status.into(),
        stdout,
        stderr,
        timed_out: output.timed_out,
    }
}
