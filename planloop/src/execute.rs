//! Execution sweep over a validated plan.
//!
//! Steps run strictly in plan order, each at most once. A step that fails to
//! launch or exits non-zero is recorded and the sweep moves on; only an
//! expired attempt deadline halts the remaining steps.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::core::types::{ExecutionHalt, ExecutionReport, ExecutionResult};
use crate::core::validator::ExecutablePlan;
use crate::tool::{InvocationLimits, ToolRegistry};

/// Per-step resource limits applied during a sweep.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionLimits {
    /// Ceiling for a single tool invocation. The remaining attempt budget
    /// caps it further when the deadline is closer than this.
    pub tool_timeout: Duration,
    /// Truncation threshold for each captured stream.
    pub output_limit_bytes: usize,
}

/// Run every step of `plan` against the live tools in `registry`.
///
/// Returns a report with one [`ExecutionResult`] per step that ran. The
/// report carries a halt marker instead when `deadline` expired before a
/// step could start.
#[instrument(skip_all, fields(steps = plan.plan().steps.len(), attempt = plan.plan().attempt))]
pub fn execute_plan(
    plan: &ExecutablePlan,
    registry: &ToolRegistry,
    deadline: Instant,
    limits: &ExecutionLimits,
) -> ExecutionReport {
    let mut results = Vec::with_capacity(plan.plan().steps.len());
    let mut halt = None;

    for step in &plan.plan().steps {
        let Some(call) = step.as_tool_call() else {
            debug!(step_index = step.index, "informational step, nothing to run");
            results.push(ExecutionResult::info(step.index));
            continue;
        };

        let Some(remaining) = remaining_budget(deadline) else {
            warn!(step_index = step.index, "attempt deadline expired, halting sweep");
            halt = Some(ExecutionHalt::DeadlineExceeded { step_index: step.index });
            break;
        };

        // Validation already proved the tool exists; a miss here means the
        // registry changed under us, so record it as a fault instead of
        // panicking.
        let Some(tool) = registry.tool(&call.tool) else {
            warn!(step_index = step.index, tool = %call.tool, "tool vanished from registry");
            results.push(ExecutionResult::fault(
                step.index,
                format!("tool `{}` is not registered", call.tool),
            ));
            continue;
        };

        let invocation = InvocationLimits {
            timeout: remaining.min(limits.tool_timeout),
            output_limit_bytes: limits.output_limit_bytes,
        };
        debug!(step_index = step.index, tool = %call.tool, timeout_secs = invocation.timeout.as_secs(), "invoking tool");
        let result = match tool.execute(&call.inputs, &invocation) {
            Ok(output) => ExecutionResult::from_output(step.index, output),
            Err(err) => {
                warn!(step_index = step.index, tool = %call.tool, err = %format!("{err:#}"), "tool invocation failed");
                ExecutionResult::fault(step.index, format!("{err:#}"))
            }
        };
        if result.success {
            debug!(step_index = step.index, tool = %call.tool, "step succeeded");
        } else {
            info!(step_index = step.index, tool = %call.tool, "step failed");
        }
        results.push(result);
    }

    ExecutionReport { results, halt }
}

/// Time left until `deadline`, or `None` once it has passed.
fn remaining_budget(deadline: Instant) -> Option<Duration> {
    let remaining = deadline
        .checked_duration_since(Instant::now())
        .unwrap_or(Duration::from_secs(0));
    if remaining.is_zero() { None } else { Some(remaining) }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use serde_json::json;

    use super::{ExecutionLimits, execute_plan};
    use crate::core::types::ExecutionHalt;
    use crate::core::validator::{ExecutablePlan, validate_candidate};
    use crate::test_support::{ScriptedOutcome, ScriptedTool, ToolCallRecorder, tool_output};
    use crate::tool::ToolRegistry;

    const LIMITS: ExecutionLimits = ExecutionLimits {
        tool_timeout: Duration::from_secs(5),
        output_limit_bytes: 10_000,
    };

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn executable(payload: serde_json::Value, registry: &ToolRegistry) -> ExecutablePlan {
        validate_candidate(&payload, registry, 1)
            .executable()
            .unwrap()
    }

    #[test]
    fn runs_steps_in_order_exactly_once() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(ScriptedTool::new(
                "first",
                vec![ScriptedOutcome::Output(tool_output(0, "one"))],
                &recorder,
            )))
            .unwrap();
        registry
            .register(Box::new(ScriptedTool::new(
                "second",
                vec![ScriptedOutcome::Output(tool_output(0, "two"))],
                &recorder,
            )))
            .unwrap();

        let payload = json!({
            "plan": [
                {"type": "tool", "tool": "first", "inputs": {}},
                {"type": "tool", "tool": "second", "inputs": {}},
            ]
        });
        let report = execute_plan(&executable(payload, &registry), &registry, far_deadline(), &LIMITS);

        assert_eq!(recorder.events(), vec!["execute first", "execute second"]);
        assert!(report.all_succeeded());
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[1].stdout, "two");
    }

    #[test]
    fn continues_past_faults_and_nonzero_exits() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(ScriptedTool::new(
                "broken",
                vec![ScriptedOutcome::Fault("binary not found".to_string())],
                &recorder,
            )))
            .unwrap();
        registry
            .register(Box::new(ScriptedTool::new(
                "flaky",
                vec![ScriptedOutcome::Output(tool_output(1, ""))],
                &recorder,
            )))
            .unwrap();
        registry
            .register(Box::new(ScriptedTool::new(
                "steady",
                vec![ScriptedOutcome::Output(tool_output(0, "done"))],
                &recorder,
            )))
            .unwrap();

        let payload = json!({
            "plan": [
                {"type": "tool", "tool": "broken", "inputs": {}},
                {"type": "tool", "tool": "flaky", "inputs": {}},
                {"type": "tool", "tool": "steady", "inputs": {}},
            ]
        });
        let report = execute_plan(&executable(payload, &registry), &registry, far_deadline(), &LIMITS);

        assert_eq!(
            recorder.events(),
            vec!["execute broken", "execute flaky", "execute steady"]
        );
        assert_eq!(report.results.len(), 3);
        assert!(!report.all_succeeded());
        assert!(report.results[0].fault.as_deref().unwrap().contains("binary not found"));
        assert!(!report.results[1].success);
        assert!(report.results[2].success);
        assert!(report.halt.is_none());
    }

    #[test]
    fn expired_deadline_halts_before_the_first_tool_step() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(ScriptedTool::new(
                "never",
                vec![ScriptedOutcome::Output(tool_output(0, ""))],
                &recorder,
            )))
            .unwrap();

        let payload = json!({
            "plan": [
                {"type": "info", "text": "about to run"},
                {"type": "tool", "tool": "never", "inputs": {}},
            ]
        });
        let deadline = Instant::now() - Duration::from_secs(1);
        let report = execute_plan(&executable(payload, &registry), &registry, deadline, &LIMITS);

        assert!(recorder.events().is_empty());
        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].success);
        assert_eq!(report.halt, Some(ExecutionHalt::DeadlineExceeded { step_index: 1 }));
        assert!(!report.all_succeeded());
    }

    #[test]
    fn info_steps_record_success_without_invoking_anything() {
        let recorder = ToolCallRecorder::new();
        let registry = ToolRegistry::new();

        let payload = json!({
            "plan": [
                {"type": "info", "text": "first note"},
                {"type": "info", "text": "second note"},
            ]
        });
        let report = execute_plan(&executable(payload, &registry), &registry, far_deadline(), &LIMITS);

        assert!(recorder.events().is_empty());
        assert!(report.all_succeeded());
        assert_eq!(report.results.len(), 2);
        assert!(report.results.iter().all(|r| r.exit_status.is_none()));
    }
}
