//! Prompt builder for the external plan oracle.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::run_log::RunLog;
use crate::tool::ToolSpec;

const PROPOSE_TEMPLATE: &str = include_str!("prompts/propose.md");

/// Draft 2020-12 schema for the plan payload.
///
/// Embedded verbatim into the prompt so the contract the oracle is shown is
/// the contract validation enforces; `check` compiles it for conformance
/// errors.
pub const PLAN_SCHEMA: &str = include_str!("../schemas/plan.schema.json");

/// Tool catalog entry for template rendering.
#[derive(Debug, Clone, Serialize)]
struct ToolContext {
    name: String,
    required_inputs: Vec<String>,
    output_schema: Option<String>,
}

impl ToolContext {
    fn from_spec(spec: &ToolSpec) -> Self {
        Self {
            name: spec.name.clone(),
            required_inputs: spec.required_inputs.iter().cloned().collect(),
            output_schema: spec.output_schema.clone(),
        }
    }
}

/// One prior attempt's feedback for template rendering.
#[derive(Debug, Clone, Serialize)]
struct FeedbackContext {
    attempt: u32,
    narrative: String,
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("propose", PROPOSE_TEMPLATE)
            .expect("propose template should be valid");
        Self { env }
    }

    fn render_propose(&self, goal: &str, tools: &[&ToolSpec], log: &RunLog) -> Result<String> {
        let tools: Vec<ToolContext> = tools.iter().copied().map(ToolContext::from_spec).collect();
        let history: Vec<FeedbackContext> = log
            .entries()
            .iter()
            .map(|feedback| FeedbackContext {
                attempt: feedback.attempt,
                narrative: feedback.narrative.trim_end().to_string(),
            })
            .collect();
        let template = self.env.get_template("propose")?;
        let rendered = template.render(context! {
            goal => goal.trim(),
            tools => tools,
            payload_schema => PLAN_SCHEMA.trim(),
            history => (!history.is_empty()).then_some(history),
        })?;
        Ok(rendered)
    }
}

/// Render the planning prompt for `goal`.
///
/// One template serves first plans and replans: prior feedback is included
/// whenever the run log has entries.
pub fn render_propose_prompt(goal: &str, tools: &[&ToolSpec], log: &RunLog) -> Result<String> {
    PromptEngine::new().render_propose(goal, tools, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Feedback;
    use crate::tool::ToolSpec;

    fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "git_status".to_string(),
                required_inputs: std::collections::BTreeSet::new(),
                output_schema: Some("porcelain status lines".to_string()),
            },
            ToolSpec {
                name: "shell_command".to_string(),
                required_inputs: ["command".to_string()].into_iter().collect(),
                output_schema: None,
            },
        ]
    }

    #[test]
    fn prompt_lists_goal_tools_and_schema() {
        let specs = specs();
        let refs: Vec<&ToolSpec> = specs.iter().collect();
        let prompt = render_propose_prompt("tidy the workspace", &refs, &RunLog::new()).expect("render");

        assert!(prompt.contains("<goal>"));
        assert!(prompt.contains("tidy the workspace"));
        assert!(prompt.contains("- git_status"));
        assert!(prompt.contains("output: porcelain status lines"));
        assert!(prompt.contains("- shell_command (required inputs: command)"));
        assert!(prompt.contains("\"plan\""), "schema should be embedded");
    }

    #[test]
    fn first_attempt_has_no_history_section() {
        let specs = specs();
        let refs: Vec<&ToolSpec> = specs.iter().collect();
        let prompt = render_propose_prompt("goal", &refs, &RunLog::new()).expect("render");

        assert!(!prompt.contains("<history>"));
        assert!(!prompt.contains("corrected plan"));
    }

    #[test]
    fn replan_prompt_carries_prior_narratives() {
        let mut log = RunLog::new();
        log.append(Feedback {
            goal: "goal".to_string(),
            attempt: 1,
            diagnostics: Vec::new(),
            simulations: Vec::new(),
            executions: Vec::new(),
            narrative: "Attempt 1 used the unknown tool `launch_rocket`.".to_string(),
        });

        let specs = specs();
        let refs: Vec<&ToolSpec> = specs.iter().collect();
        let prompt = render_propose_prompt("goal", &refs, &log).expect("render");

        assert!(prompt.contains("<history>"));
        assert!(prompt.contains("Attempt 1:"));
        assert!(prompt.contains("launch_rocket"));
        assert!(prompt.contains("corrected plan"));
    }

    #[test]
    fn placeholder_rule_renders_the_literal_mustache_token() {
        let specs = specs();
        let refs: Vec<&ToolSpec> = specs.iter().collect();
        let prompt = render_propose_prompt("goal", &refs, &RunLog::new()).expect("render");

        assert!(prompt.contains("{{var}}"));
        assert!(prompt.contains("$output[0]"));
    }
}
