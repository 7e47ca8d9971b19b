//! Shared contract types for the plan lifecycle.
//!
//! These types define stable contracts between lifecycle stages. Every value
//! here is produced once and read-only thereafter; the run log is the only
//! entity that grows, and it only ever appends.

use serde::{Deserialize, Serialize};

use crate::tool::{ExitStatus, ToolOutput};

/// Classification of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Step names a tool the registry does not know.
    UnknownTool,
    /// A required input key is absent or empty.
    MissingInput,
    /// An input value contains an unresolved template token.
    PlaceholderDetected,
    /// Step shape does not match any known kind.
    MalformedStep,
}

impl DiagnosticKind {
    /// Short label used in narratives and CLI output.
    pub fn label(self) -> &'static str {
        match self {
            Self::UnknownTool => "unknown tool",
            Self::MissingInput => "missing input",
            Self::PlaceholderDetected => "unresolved placeholder",
            Self::MalformedStep => "malformed step",
        }
    }
}

/// One structured finding from plan validation.
///
/// `step_index` addresses the step's position in the candidate payload, which
/// stays valid even when malformed entries were dropped from the parsed plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub step_index: usize,
    pub message: String,
}

/// Predicted outcome for one tool step. Advisory only: a risk never blocks
/// execution, it is surfaced in logs and feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub step_index: usize,
    pub predicted_effect: String,
    /// Set when the effect could not be predicted.
    pub risk_flag: bool,
}

/// Actual outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub step_index: usize,
    /// `None` when no process produced a status (faulted or info step).
    pub exit_status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    /// Set when the tool could not be invoked at all.
    pub fault: Option<String>,
    /// True when the invocation was killed at its deadline.
    pub timed_out: bool,
    /// Derived strictly from `exit_status` in [`ExecutionResult::from_output`],
    /// never from the absence of an error.
    pub success: bool,
}

impl ExecutionResult {
    /// Record a completed tool invocation. Success is computed here and
    /// nowhere else: a normal exit with code zero.
    pub fn from_output(step_index: usize, output: ToolOutput) -> Self {
        Self {
            step_index,
            success: output.exit_status.success(),
            exit_status: Some(output.exit_status),
            stdout: output.stdout,
            stderr: output.stderr,
            fault: None,
            timed_out: output.timed_out,
        }
    }

    /// Record a step whose tool could not be invoked.
    pub fn fault(step_index: usize, message: impl Into<String>) -> Self {
        Self {
            step_index,
            exit_status: None,
            stdout: String::new(),
            stderr: String::new(),
            fault: Some(message.into()),
            timed_out: false,
            success: false,
        }
    }

    /// Record an informational step. Info steps never execute and are
    /// trivially successful.
    pub fn info(step_index: usize) -> Self {
        Self {
            step_index,
            exit_status: None,
            stdout: String::new(),
            stderr: String::new(),
            fault: None,
            timed_out: false,
            success: true,
        }
    }
}

/// Why an execution sweep stopped before covering every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExecutionHalt {
    /// The attempt deadline expired before this step started.
    DeadlineExceeded { step_index: usize },
}

/// Outcome of executing one plan: per-step results plus an optional early
/// halt. Steps after the halt point have no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub results: Vec<ExecutionResult>,
    pub halt: Option<ExecutionHalt>,
}

impl ExecutionReport {
    /// True when every recorded step succeeded and the sweep was not cut
    /// short. Vacuously true for an empty plan.
    pub fn all_succeeded(&self) -> bool {
        self.halt.is_none() && self.results.iter().all(|result| result.success)
    }
}

/// Run-level synthesis of one attempt, appended to the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub goal: String,
    /// 1-indexed planning attempt this feedback describes.
    pub attempt: u32,
    pub diagnostics: Vec<Diagnostic>,
    pub simulations: Vec<SimulationResult>,
    pub executions: Vec<ExecutionResult>,
    /// Narrative injected verbatim into the next planning prompt.
    pub narrative: String,
}

/// How one attempt ended, from the orchestrator's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptDisposition {
    /// Oracle output contained no parseable plan payload.
    ParseFailure { reason: String },
    /// Validation found blocking diagnostics; nothing was executed.
    Rejected,
    /// Every step ran and succeeded.
    Succeeded,
    /// The plan executed with at least one failed, faulted, or skipped step.
    ExecutedWithFailures,
}
