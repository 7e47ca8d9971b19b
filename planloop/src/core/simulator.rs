//! Pre-execution effect prediction.
//!
//! The safety gate before anything runs for real: every tool step of an
//! executable plan gets a predicted effect derived from declared contracts.
//! Predictions never invoke external processes or mutate state, and a step
//! that cannot be predicted is flagged as a risk rather than an error.

use crate::core::plan::ToolCall;
use crate::core::types::SimulationResult;
use crate::core::validator::ExecutablePlan;
use crate::tool::ToolRegistry;

/// Predict the effect of every tool step in `plan`, in plan order.
///
/// Info steps have no effect to predict and produce no result.
pub fn simulate_plan(plan: &ExecutablePlan, registry: &ToolRegistry) -> Vec<SimulationResult> {
    plan.plan()
        .tool_calls()
        .map(|(step_index, call)| match predict_effect(call, registry) {
            Ok(predicted_effect) => SimulationResult {
                step_index,
                predicted_effect,
                risk_flag: false,
            },
            Err(reason) => SimulationResult {
                step_index,
                predicted_effect: reason,
                risk_flag: true,
            },
        })
        .collect()
}

fn predict_effect(call: &ToolCall, registry: &ToolRegistry) -> Result<String, String> {
    // The executable-plan gate guarantees every tool resolves; a miss is
    // reported as a risk rather than a panic.
    let Some(tool) = registry.tool(&call.tool) else {
        return Err(format!("tool `{}` is not registered", call.tool));
    };
    tool.predict(&call.inputs)
        .map_err(|err| format!("prediction unavailable: {err:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::validate_candidate;
    use crate::test_support::{ScriptedTool, ToolCallRecorder};
    use serde_json::json;

    #[test]
    fn predicts_every_tool_step_in_order() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(ScriptedTool::new("first", Vec::new(), &recorder)))
            .expect("register");
        registry
            .register(Box::new(ScriptedTool::new("second", Vec::new(), &recorder)))
            .expect("register");

        let payload = json!({"plan": [
            {"type": "tool", "tool": "first"},
            {"type": "info", "text": "breathe"},
            {"type": "tool", "tool": "second"},
        ]});
        let review = validate_candidate(&payload, &registry, 1);
        let plan = review.executable().expect("executable");

        let results = simulate_plan(&plan, &registry);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].step_index, 0);
        assert_eq!(results[1].step_index, 2);
        assert!(results.iter().all(|r| !r.risk_flag));
        assert_eq!(
            recorder.events(),
            vec!["predict first".to_string(), "predict second".to_string()]
        );
    }

    #[test]
    fn failed_prediction_sets_risk_flag_without_blocking() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(
                ScriptedTool::new("opaque", Vec::new(), &recorder)
                    .with_predict_fault("backend offline"),
            ))
            .expect("register");

        let payload = json!({"plan": [{"type": "tool", "tool": "opaque"}]});
        let review = validate_candidate(&payload, &registry, 1);
        let plan = review.executable().expect("executable");

        let results = simulate_plan(&plan, &registry);
        assert_eq!(results.len(), 1);
        assert!(results[0].risk_flag);
        assert!(results[0].predicted_effect.contains("backend offline"));
    }

    #[test]
    fn empty_plan_simulates_to_nothing() {
        let registry = ToolRegistry::new();
        let review = validate_candidate(&json!({"plan": []}), &registry, 1);
        let plan = review.executable().expect("executable");

        assert!(simulate_plan(&plan, &registry).is_empty());
    }
}
