//! Candidate plan validation.
//!
//! Turns an untrusted payload into a best-effort [`Plan`] plus an ordered
//! list of [`Diagnostic`]s, so callers can show what was understood even when
//! the plan is rejected. Checks run per step in a fixed precedence:
//!
//! 1. step shape (`MalformedStep`, the step is dropped from the plan),
//! 2. tool existence (`UnknownTool`, no further checks for the step),
//! 3. required inputs (`MissingInput`, one diagnostic per key),
//! 4. placeholder scan over every input value (`PlaceholderDetected`).
//!
//! Any diagnostic blocks execution: the placeholder scan only covers tool
//! step inputs, so info text never produces findings.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::core::plan::{Plan, PlanStep, StepAction, ToolCall};
use crate::core::types::{Diagnostic, DiagnosticKind};
use crate::tool::{ToolInputs, ToolRegistry};

/// Unresolved-token shapes: `<file>`, `$output[...]`, `{{var}}`.
///
/// A heuristic, not a parser. The angle pattern requires a letter right after
/// `<` so comparisons like `a < b` and shell redirects pass through.
static ANGLE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z][A-Za-z0-9_\- ]*>").unwrap());
static OUTPUT_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$output\[[^\]]*\]").unwrap());
static MUSTACHE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^{}]*\}\}").unwrap());

/// Outcome of validating one candidate payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanReview {
    pub plan: Plan,
    pub diagnostics: Vec<Diagnostic>,
}

impl PlanReview {
    /// Gate into the execution path: `Some` only when validation produced
    /// zero diagnostics.
    pub fn executable(&self) -> Option<ExecutablePlan> {
        self.diagnostics
            .is_empty()
            .then(|| ExecutablePlan(self.plan.clone()))
    }
}

/// A plan that passed validation with zero diagnostics.
///
/// Constructed only by [`PlanReview::executable`], so the simulator and
/// executor cannot be handed a rejected plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutablePlan(Plan);

impl ExecutablePlan {
    pub fn plan(&self) -> &Plan {
        &self.0
    }
}

/// Validate a candidate payload against the registry snapshot.
///
/// The payload is expected to be an object with a `plan` array (the shape
/// [`crate::core::extract::extract_plan_payload`] guarantees); anything else
/// yields a single `MalformedStep` finding and an empty plan.
pub fn validate_candidate(payload: &Value, registry: &ToolRegistry, attempt: u32) -> PlanReview {
    let mut steps = Vec::new();
    let mut diagnostics = Vec::new();

    let Some(candidates) = payload.get("plan").and_then(Value::as_array) else {
        diagnostics.push(Diagnostic {
            kind: DiagnosticKind::MalformedStep,
            step_index: 0,
            message: "payload has no `plan` array".to_string(),
        });
        return PlanReview {
            plan: Plan { attempt, steps },
            diagnostics,
        };
    };

    for (index, candidate) in candidates.iter().enumerate() {
        match parse_step(candidate) {
            Ok(action) => {
                if let StepAction::Tool(call) = &action {
                    diagnostics.extend(check_tool_call(index, call, registry));
                }
                steps.push(PlanStep { index, action });
            }
            Err(message) => {
                // Recorded but dropped: a step of unknown shape cannot be
                // represented in the plan.
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::MalformedStep,
                    step_index: index,
                    message,
                });
            }
        }
    }

    PlanReview {
        plan: Plan { attempt, steps },
        diagnostics,
    }
}

fn parse_step(candidate: &Value) -> Result<StepAction, String> {
    let Some(object) = candidate.as_object() else {
        return Err("step is not an object".to_string());
    };
    let Some(kind) = object.get("type").and_then(Value::as_str) else {
        return Err("step has no `type` field".to_string());
    };
    match kind {
        "tool" => {
            let Some(tool) = object.get("tool").and_then(Value::as_str) else {
                return Err("tool step has no `tool` name".to_string());
            };
            let inputs = parse_inputs(object.get("inputs"))?;
            // Rationale is advisory; anything but a string is ignored.
            let rationale = object
                .get("rationale")
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(StepAction::Tool(ToolCall {
                tool: tool.to_string(),
                inputs,
                rationale,
            }))
        }
        "info" => {
            let Some(text) = object.get("text").and_then(Value::as_str) else {
                return Err("info step has no `text` field".to_string());
            };
            Ok(StepAction::Info { text: text.to_string() })
        }
        other => Err(format!("unknown step type `{other}`")),
    }
}

fn parse_inputs(value: Option<&Value>) -> Result<ToolInputs, String> {
    let Some(value) = value else {
        return Ok(ToolInputs::new());
    };
    let Some(map) = value.as_object() else {
        return Err("`inputs` must be an object".to_string());
    };
    let mut inputs = ToolInputs::new();
    for (key, value) in map {
        let Some(text) = value.as_str() else {
            return Err(format!("input `{key}` must be a string"));
        };
        inputs.insert(key.clone(), text.to_string());
    }
    Ok(inputs)
}

fn check_tool_call(index: usize, call: &ToolCall, registry: &ToolRegistry) -> Vec<Diagnostic> {
    let mut found = Vec::new();

    let Some(spec) = registry.lookup(&call.tool) else {
        found.push(Diagnostic {
            kind: DiagnosticKind::UnknownTool,
            step_index: index,
            message: format!("tool `{}` is not registered", call.tool),
        });
        return found;
    };

    for key in &spec.required_inputs {
        match call.inputs.get(key) {
            None => found.push(Diagnostic {
                kind: DiagnosticKind::MissingInput,
                step_index: index,
                message: format!("required input `{key}` is missing"),
            }),
            Some(value) if value.trim().is_empty() => found.push(Diagnostic {
                kind: DiagnosticKind::MissingInput,
                step_index: index,
                message: format!("required input `{key}` is empty"),
            }),
            Some(_) => {}
        }
    }

    for (key, value) in &call.inputs {
        if let Some(token) = placeholder_token(value) {
            found.push(Diagnostic {
                kind: DiagnosticKind::PlaceholderDetected,
                step_index: index,
                message: format!("input `{key}` contains unresolved placeholder `{token}`"),
            });
        }
    }

    found
}

/// First unresolved token in `value`, if any. One finding per value.
fn placeholder_token(value: &str) -> Option<&str> {
    for re in [&*ANGLE_TOKEN_RE, &*OUTPUT_REF_RE, &*MUSTACHE_RE] {
        if let Some(found) = re.find(value) {
            return Some(found.as_str());
        }
    }
    None
}
