//! Plan and step model.
//!
//! Plans are immutable once built: replanning produces a new [`Plan`] value
//! with a fresh attempt index, never a mutation of the old one.

use serde::{Deserialize, Serialize};

use crate::tool::ToolInputs;

/// A tool invocation proposed by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub inputs: ToolInputs,
    /// Oracle-provided justification, carried for logs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// One unit of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepAction {
    /// Invoke a registered tool.
    Tool(ToolCall),
    /// Informational note; never executed.
    Info { text: String },
}

/// A parsed step with its position in the original candidate payload.
///
/// The index is assigned from the candidate's step list and stays stable even
/// when malformed entries were dropped, so diagnostics, simulation results,
/// and execution results all address the same positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub index: usize,
    #[serde(flatten)]
    pub action: StepAction,
}

impl PlanStep {
    /// The tool call this step makes, if it makes one.
    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match &self.action {
            StepAction::Tool(call) => Some(call),
            StepAction::Info { .. } => None,
        }
    }
}

/// An ordered sequence of steps plus provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// 1-indexed planning attempt that produced this plan.
    pub attempt: u32,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Steps that invoke tools, in plan order, with their payload indices.
    pub fn tool_calls(&self) -> impl Iterator<Item = (usize, &ToolCall)> {
        self.steps.iter().filter_map(|step| match &step.action {
            StepAction::Tool(call) => Some((step.index, call)),
            StepAction::Info { .. } => None,
        })
    }
}
