//! Scripted fakes for driving the lifecycle in tests.
//!
//! [`ScriptedOracle`] and [`ScriptedTool`] return predetermined outputs and
//! record every invocation, so tests can assert ordering and exactly-once
//! behavior without spawning processes.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use anyhow::{Result, anyhow};

use crate::io::oracle::{PlanOracle, ProposeRequest};
use crate::tool::{InvocationLimits, Tool, ToolInputs, ToolOutput};

/// Shared log of tool invocations, in call order.
///
/// Clones share the same log, so one recorder can watch several tools.
#[derive(Clone, Default)]
pub struct ToolCallRecorder {
    events: Rc<RefCell<Vec<String>>>,
}

impl ToolCallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn record(&self, kind: &str, name: &str) {
        self.events.borrow_mut().push(format!("{kind} {name}"));
    }
}

/// What a [`ScriptedTool`] does on its next invocation.
pub enum ScriptedOutcome {
    /// Return this output.
    Output(ToolOutput),
    /// Fail to launch with this message.
    Fault(String),
}

/// Tool that replays scripted outcomes and records its invocations.
pub struct ScriptedTool {
    name: String,
    required: BTreeSet<String>,
    outcomes: RefCell<VecDeque<ScriptedOutcome>>,
    predict_fault: Option<String>,
    recorder: ToolCallRecorder,
}

impl ScriptedTool {
    pub fn new(name: &str, outcomes: Vec<ScriptedOutcome>, recorder: &ToolCallRecorder) -> Self {
        Self {
            name: name.to_string(),
            required: BTreeSet::new(),
            outcomes: RefCell::new(outcomes.into()),
            predict_fault: None,
            recorder: recorder.clone(),
        }
    }

    /// Declare `key` as a required input.
    pub fn with_required_input(mut self, key: &str) -> Self {
        self.required.insert(key.to_string());
        self
    }

    /// Make `predict` fail with `message` instead of producing an effect.
    pub fn with_predict_fault(mut self, message: &str) -> Self {
        self.predict_fault = Some(message.to_string());
        self
    }
}

impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_inputs(&self) -> BTreeSet<String> {
        self.required.clone()
    }

    fn execute(&self, _inputs: &ToolInputs, _limits: &InvocationLimits) -> Result<ToolOutput> {
        self.recorder.record("execute", &self.name);
        match self.outcomes.borrow_mut().pop_front() {
            Some(ScriptedOutcome::Output(output)) => Ok(output),
            Some(ScriptedOutcome::Fault(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted tool `{}` has no outcomes left", self.name)),
        }
    }

    fn predict(&self, _inputs: &ToolInputs) -> Result<String> {
        self.recorder.record("predict", &self.name);
        match &self.predict_fault {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(format!("scripted effect of {}", self.name)),
        }
    }
}

/// Oracle that replays scripted raw outputs and records requested attempts.
pub struct ScriptedOracle {
    outputs: RefCell<VecDeque<String>>,
    attempts: RefCell<Vec<u32>>,
}

impl ScriptedOracle {
    pub fn new(outputs: Vec<String>) -> Self {
        Self {
            outputs: RefCell::new(outputs.into()),
            attempts: RefCell::new(Vec::new()),
        }
    }

    /// Attempt numbers this oracle was asked to plan for, in call order.
    pub fn attempts(&self) -> Vec<u32> {
        self.attempts.borrow().clone()
    }
}

impl PlanOracle for ScriptedOracle {
    fn propose(&self, request: &ProposeRequest<'_>) -> Result<String> {
        self.attempts.borrow_mut().push(request.attempt);
        self.outputs
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted oracle has no outputs left"))
    }
}

/// Shorthand for a non-timed-out [`ToolOutput`] with the given exit code.
pub fn tool_output(code: i32, stdout: &str) -> ToolOutput {
    ToolOutput {
        exit_status: crate::tool::ExitStatus::Code(code),
        stdout: stdout.to_string(),
        stderr: String::new(),
        timed_out: false,
    }
}
