//! One full attempt: plan, validate, simulate, execute, reflect.
//!
//! Every path through an attempt ends in reflection, so the run log gains
//! exactly one entry per attempt no matter how early the attempt derailed.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::extract::extract_plan_payload;
use crate::core::plan::Plan;
use crate::core::reflector::{ReflectionInput, reflect};
use crate::core::run_log::RunLog;
use crate::core::simulator::simulate_plan;
use crate::core::types::{
    AttemptDisposition, Diagnostic, ExecutionReport, Feedback, SimulationResult,
};
use crate::core::validator::validate_candidate;
use crate::execute::{ExecutionLimits, execute_plan};
use crate::io::config::EngineConfig;
use crate::io::oracle::{PlanOracle, ProposeRequest};
use crate::tool::ToolRegistry;

/// Immutable surroundings of a run, shared by its attempts.
pub struct AttemptContext<'a> {
    pub goal: &'a str,
    pub registry: &'a ToolRegistry,
    pub config: &'a EngineConfig,
}

/// Everything one attempt produced, for artifacts and the decision.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    /// Raw oracle text; `None` when the oracle call itself failed.
    pub raw_oracle_output: Option<String>,
    /// Parsed plan; `None` on the parse-failure path.
    pub plan: Option<Plan>,
    pub diagnostics: Vec<Diagnostic>,
    pub simulations: Vec<SimulationResult>,
    pub execution: Option<ExecutionReport>,
    pub feedback: Feedback,
    pub disposition: AttemptDisposition,
}

/// Run attempt number `attempt` from start to reflection.
///
/// The deadline for the whole attempt starts now; the oracle call and every
/// tool invocation share it. Errors are reserved for broken machinery
/// (template rendering); a misbehaving oracle or failing tool comes back as
/// a normal record.
#[instrument(skip_all, fields(attempt))]
pub fn run_attempt<O: PlanOracle>(
    oracle: &O,
    attempt: u32,
    ctx: &AttemptContext<'_>,
    log: &mut RunLog,
) -> Result<AttemptRecord> {
    let deadline = Instant::now() + ctx.config.attempt_timeout();

    let request = ProposeRequest {
        goal: ctx.goal,
        attempt,
        tools: ctx.registry.all(),
        log: &*log,
        timeout: ctx.config.attempt_timeout(),
        output_limit_bytes: ctx.config.oracle_output_limit_bytes,
    };
    let raw = match oracle.propose(&request) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "oracle call failed");
            return finish_parse_failure(attempt, None, format!("{err:#}"), ctx, log);
        }
    };

    let payload = match extract_plan_payload(&raw) {
        Ok(payload) => payload,
        Err(failure) => {
            info!(reason = %failure.reason, "oracle output had no plan payload");
            let reason = failure.to_string();
            return finish_parse_failure(attempt, Some(raw), reason, ctx, log);
        }
    };

    let review = validate_candidate(&payload, ctx.registry, attempt);
    let (simulations, execution, disposition) = match review.executable() {
        Some(executable) => {
            let simulations = simulate_plan(&executable, ctx.registry);
            let limits = ExecutionLimits {
                tool_timeout: ctx.config.tool_timeout(),
                output_limit_bytes: ctx.config.tool_output_limit_bytes,
            };
            let report = execute_plan(&executable, ctx.registry, deadline, &limits);
            let disposition = if report.all_succeeded() {
                AttemptDisposition::Succeeded
            } else {
                AttemptDisposition::ExecutedWithFailures
            };
            (simulations, Some(report), disposition)
        }
        None => {
            info!(
                diagnostics = review.diagnostics.len(),
                "plan rejected before execution"
            );
            (Vec::new(), None, AttemptDisposition::Rejected)
        }
    };

    let feedback = reflect(
        &ReflectionInput {
            goal: ctx.goal,
            attempt,
            disposition: &disposition,
            diagnostics: &review.diagnostics,
            simulations: &simulations,
            execution: execution.as_ref(),
        },
        log,
    )?;

    Ok(AttemptRecord {
        attempt,
        raw_oracle_output: Some(raw),
        plan: Some(review.plan),
        diagnostics: review.diagnostics,
        simulations,
        execution,
        feedback,
        disposition,
    })
}

fn finish_parse_failure(
    attempt: u32,
    raw: Option<String>,
    reason: String,
    ctx: &AttemptContext<'_>,
    log: &mut RunLog,
) -> Result<AttemptRecord> {
    let disposition = AttemptDisposition::ParseFailure { reason };
    let feedback = reflect(
        &ReflectionInput {
            goal: ctx.goal,
            attempt,
            disposition: &disposition,
            diagnostics: &[],
            simulations: &[],
            execution: None,
        },
        log,
    )?;
    Ok(AttemptRecord {
        attempt,
        raw_oracle_output: raw,
        plan: None,
        diagnostics: Vec::new(),
        simulations: Vec::new(),
        execution: None,
        feedback,
        disposition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedOracle, ScriptedOutcome, ScriptedTool, ToolCallRecorder, tool_output};

    fn context<'a>(registry: &'a ToolRegistry, config: &'a EngineConfig) -> AttemptContext<'a> {
        AttemptContext {
            goal: "tidy the workspace",
            registry,
            config,
        }
    }

    #[test]
    fn successful_attempt_simulates_then_executes() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(ScriptedTool::new(
                "sweep",
                vec![ScriptedOutcome::Output(tool_output(0, "swept"))],
                &recorder,
            )))
            .unwrap();
        let config = EngineConfig::default();
        let oracle = ScriptedOracle::new(vec![
            r#"{"plan": [{"type": "tool", "tool": "sweep", "inputs": {}}]}"#.to_string(),
        ]);
        let mut log = RunLog::new();

        let record = run_attempt(&oracle, 1, &context(&registry, &config), &mut log).expect("attempt");

        assert_eq!(record.disposition, AttemptDisposition::Succeeded);
        assert_eq!(recorder.events(), vec!["predict sweep", "execute sweep"]);
        assert_eq!(record.simulations.len(), 1);
        assert!(record.execution.as_ref().unwrap().all_succeeded());
        assert_eq!(log.len(), 1);
        assert_eq!(oracle.attempts(), vec![1]);
    }

    #[test]
    fn rejected_plan_never_reaches_simulation_or_execution() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(ScriptedTool::new(
                "sweep",
                Vec::new(),
                &recorder,
            )))
            .unwrap();
        let config = EngineConfig::default();
        let oracle = ScriptedOracle::new(vec![
            r#"{"plan": [{"type": "tool", "tool": "launch_rocket", "inputs": {}}]}"#.to_string(),
        ]);
        let mut log = RunLog::new();

        let record = run_attempt(&oracle, 1, &context(&registry, &config), &mut log).expect("attempt");

        assert_eq!(record.disposition, AttemptDisposition::Rejected);
        assert!(recorder.events().is_empty());
        assert!(record.execution.is_none());
        assert!(record.simulations.is_empty());
        assert_eq!(record.diagnostics.len(), 1);
        assert!(record.feedback.narrative.contains("launch_rocket"));
    }

    #[test]
    fn unparseable_output_becomes_a_parse_failure_with_raw_text_kept() {
        let registry = ToolRegistry::new();
        let config = EngineConfig::default();
        let oracle = ScriptedOracle::new(vec!["I am sorry, I cannot plan today.".to_string()]);
        let mut log = RunLog::new();

        let record = run_attempt(&oracle, 1, &context(&registry, &config), &mut log).expect("attempt");

        assert!(matches!(record.disposition, AttemptDisposition::ParseFailure { .. }));
        assert!(record.raw_oracle_output.as_deref().unwrap().contains("sorry"));
        assert!(record.plan.is_none());
        assert_eq!(log.len(), 1);
        assert!(log.entries()[0].narrative.contains("no usable plan"));
    }

    #[test]
    fn oracle_failure_is_a_parse_failure_without_raw_text() {
        let registry = ToolRegistry::new();
        let config = EngineConfig::default();
        let oracle = ScriptedOracle::new(Vec::new());
        let mut log = RunLog::new();

        let record = run_attempt(&oracle, 1, &context(&registry, &config), &mut log).expect("attempt");

        assert!(matches!(record.disposition, AttemptDisposition::ParseFailure { .. }));
        assert!(record.raw_oracle_output.is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn failing_execution_is_recorded_but_not_an_error() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(ScriptedTool::new(
                "sweep",
                vec![ScriptedOutcome::Output(tool_output(2, ""))],
                &recorder,
            )))
            .unwrap();
        let config = EngineConfig::default();
        let oracle = ScriptedOracle::new(vec![
            r#"{"plan": [{"type": "tool", "tool": "sweep", "inputs": {}}]}"#.to_string(),
        ]);
        let mut log = RunLog::new();

        let record = run_attempt(&oracle, 1, &context(&registry, &config), &mut log).expect("attempt");

        assert_eq!(record.disposition, AttemptDisposition::ExecutedWithFailures);
        let report = record.execution.as_ref().unwrap();
        assert!(!report.all_succeeded());
        assert!(record.feedback.narrative.contains("exit code 2"));
    }

    #[test]
    fn empty_plan_succeeds_vacuously() {
        let registry = ToolRegistry::new();
        let config = EngineConfig::default();
        let oracle = ScriptedOracle::new(vec![r#"{"plan": []}"#.to_string()]);
        let mut log = RunLog::new();

        let record = run_attempt(&oracle, 1, &context(&registry, &config), &mut log).expect("attempt");

        assert_eq!(record.disposition, AttemptDisposition::Succeeded);
        assert!(record.execution.as_ref().unwrap().results.is_empty());
    }
}
