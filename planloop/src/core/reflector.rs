//! Feedback synthesis.
//!
//! Consumes everything one attempt produced and renders it into a single
//! [`Feedback`] value appended to the run log. Synthesis is template-based:
//! the narrative enumerates rejection reasons, failed steps, and risks so the
//! next planning prompt can carry it verbatim.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::run_log::RunLog;
use crate::core::types::{
    AttemptDisposition, Diagnostic, ExecutionHalt, ExecutionReport, Feedback, SimulationResult,
};

const FEEDBACK_TEMPLATE: &str = include_str!("templates/feedback.md");

/// Inputs for one feedback synthesis.
#[derive(Debug, Clone)]
pub struct ReflectionInput<'a> {
    pub goal: &'a str,
    pub attempt: u32,
    pub disposition: &'a AttemptDisposition,
    pub diagnostics: &'a [Diagnostic],
    pub simulations: &'a [SimulationResult],
    /// `None` on the rejected and parse-failure paths.
    pub execution: Option<&'a ExecutionReport>,
}

#[derive(Debug, Clone, Serialize)]
struct FindingContext {
    step_index: usize,
    kind: &'static str,
    message: String,
}

#[derive(Debug, Clone, Serialize)]
struct FailureContext {
    step_index: usize,
    outcome: String,
    detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct RiskContext {
    step_index: usize,
    predicted_effect: String,
}

/// Synthesize feedback for one attempt and append it to the run log.
pub fn reflect(input: &ReflectionInput<'_>, log: &mut RunLog) -> Result<Feedback> {
    let narrative = render_narrative(input)?;
    let feedback = Feedback {
        goal: input.goal.to_string(),
        attempt: input.attempt,
        diagnostics: input.diagnostics.to_vec(),
        simulations: input.simulations.to_vec(),
        executions: input
            .execution
            .map(|report| report.results.clone())
            .unwrap_or_default(),
        narrative,
    };
    log.append(feedback.clone());
    Ok(feedback)
}

fn render_narrative(input: &ReflectionInput<'_>) -> Result<String> {
    let parse_reason = match input.disposition {
        AttemptDisposition::ParseFailure { reason } => Some(reason.clone()),
        _ => None,
    };
    let diagnostics: Vec<FindingContext> = input
        .diagnostics
        .iter()
        .map(|diagnostic| FindingContext {
            step_index: diagnostic.step_index,
            kind: diagnostic.kind.label(),
            message: diagnostic.message.clone(),
        })
        .collect();
    let failures: Vec<FailureContext> = input.execution.map(failures_of).unwrap_or_default();
    let risks: Vec<RiskContext> = input
        .simulations
        .iter()
        .filter(|simulation| simulation.risk_flag)
        .map(|simulation| RiskContext {
            step_index: simulation.step_index,
            predicted_effect: simulation.predicted_effect.clone(),
        })
        .collect();
    let halted_step = input
        .execution
        .and_then(|report| report.halt.as_ref())
        .map(|halt| match halt {
            ExecutionHalt::DeadlineExceeded { step_index } => *step_index,
        });

    let mut env = Environment::new();
    env.add_template("feedback", FEEDBACK_TEMPLATE)
        .expect("feedback template should be valid");
    let template = env.get_template("feedback")?;
    let rendered = template.render(context! {
        attempt => input.attempt,
        parse_reason => parse_reason,
        diagnostics => diagnostics,
        succeeded => matches!(input.disposition, AttemptDisposition::Succeeded),
        executed_count => input.execution.map(|report| report.results.len()).unwrap_or(0),
        failures => failures,
        halted => halted_step.is_some(),
        halted_step => halted_step.unwrap_or(0),
        risks => risks,
    })?;
    Ok(format!("{}\n", rendered.trim()))
}

fn failures_of(report: &ExecutionReport) -> Vec<FailureContext> {
    report
        .results
        .iter()
        .filter(|result| !result.success)
        .map(|result| {
            let outcome = match (&result.fault, result.exit_status) {
                (Some(fault), _) => format!("could not be invoked: {fault}"),
                (None, Some(status)) if result.timed_out => format!("timed out, {status}"),
                (None, Some(status)) => status.to_string(),
                (None, None) => "no exit status".to_string(),
            };
            FailureContext {
                step_index: result.step_index,
                outcome,
                detail: stderr_snippet(&result.stderr),
            }
        })
        .collect()
}

/// First non-empty stderr line, truncated to keep narratives short.
fn stderr_snippet(stderr: &str) -> Option<String> {
    let line = stderr.lines().map(str::trim).find(|line| !line.is_empty())?;
    let mut snippet: String = line.chars().take(200).collect();
    if line.chars().count() > 200 {
        snippet.push_str("...");
    }
    Some(snippet)
}
