//! Tool contract and registry.
//!
//! A tool is any capability the engine can invoke: it declares a name, the
//! input keys a plan step must provide, and an optional description of its
//! output. The [`ToolRegistry`] is the sole authority on which tools exist.
//! Validation, simulation, and prompt building read declared [`ToolSpec`]s;
//! execution goes through the live trait objects stored alongside them.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Inputs supplied to a tool by a plan step, keyed by input name.
pub type ToolInputs = BTreeMap<String, String>;

/// Declared contract of a tool.
///
/// Owned by the registry and handed out read-only; the name is the unique
/// lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    /// Input keys a plan step must provide with non-empty values.
    pub required_inputs: BTreeSet<String>,
    /// Human-readable description of the output this tool produces. Used for
    /// effect prediction and oracle prompt building.
    pub output_schema: Option<String>,
}

/// Exit classification of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ExitStatus {
    /// Process exited normally with this code.
    Code(i32),
    /// Process was terminated by this signal.
    Signal(i32),
}

impl ExitStatus {
    /// True only for a normal exit with code zero.
    pub fn success(self) -> bool {
        matches!(self, ExitStatus::Code(0))
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitStatus::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitStatus::Signal(signal);
            }
        }
        // No code and no signal should not happen after wait(); report a
        // non-zero code so the step never counts as successful.
        ExitStatus::Code(-1)
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitStatus::Code(code) => write!(f, "exit code {code}"),
            ExitStatus::Signal(signal) => write!(f, "signal {signal}"),
        }
    }
}

/// Captured outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub exit_status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    /// True when the invocation was killed at its deadline.
    pub timed_out: bool,
}

/// Resource bounds for a single tool invocation.
#[derive(Debug, Clone, Copy)]
pub struct InvocationLimits {
    pub timeout: Duration,
    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// A capability the engine can plan with.
///
/// `execute` may mutate external state (files, subprocesses); `predict` must
/// not touch anything outside the process. The default `predict` describes the
/// declared output schema and the supplied input keys.
pub trait Tool {
    /// Name the registry keys this tool by.
    fn name(&self) -> &str;

    /// Input keys a plan step must provide.
    fn required_inputs(&self) -> BTreeSet<String>;

    /// Declared description of the output this tool produces.
    fn output_schema(&self) -> Option<String> {
        None
    }

    /// Run the capability for real. An `Err` means the tool could not be
    /// invoked at all; a tool that ran and failed reports that through
    /// [`ToolOutput::exit_status`].
    fn execute(&self, inputs: &ToolInputs, limits: &InvocationLimits) -> Result<ToolOutput>;

    /// Describe the expected effect without invoking anything.
    fn predict(&self, inputs: &ToolInputs) -> Result<String> {
        let mut effect = match self.output_schema() {
            Some(schema) => format!("{}: {schema}", self.name()),
            None => format!("{}: produces unspecified output", self.name()),
        };
        if !inputs.is_empty() {
            let keys: Vec<&str> = inputs.keys().map(String::as_str).collect();
            effect.push_str(&format!(" (inputs: {})", keys.join(", ")));
        }
        Ok(effect)
    }
}

/// Raised when a tool name is registered twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateToolError {
    pub name: String,
}

impl std::fmt::Display for DuplicateToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tool `{}` is already registered", self.name)
    }
}

impl std::error::Error for DuplicateToolError {}

struct RegistryEntry {
    spec: ToolSpec,
    tool: Box<dyn Tool>,
}

/// Holds every available capability, keyed by name.
///
/// Registration happens once at process start; there is no removal operation.
#[derive(Default)]
pub struct ToolRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, deriving its [`ToolSpec`] from the trait methods.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), DuplicateToolError> {
        let spec = ToolSpec {
            name: tool.name().to_string(),
            required_inputs: tool.required_inputs(),
            output_schema: tool.output_schema(),
        };
        if self.entries.contains_key(&spec.name) {
            return Err(DuplicateToolError { name: spec.name });
        }
        self.entries
            .insert(spec.name.clone(), RegistryEntry { spec, tool });
        Ok(())
    }

    /// Declared contract for a tool name, if registered.
    pub fn lookup(&self, name: &str) -> Option<&ToolSpec> {
        self.entries.get(name).map(|entry| &entry.spec)
    }

    /// Live tool for execution or prediction, if registered.
    pub fn tool(&self, name: &str) -> Option<&dyn Tool> {
        self.entries.get(name).map(|entry| entry.tool.as_ref())
    }

    /// Read-only snapshot of every declared spec, in name order.
    pub fn all(&self) -> Vec<&ToolSpec> {
        self.entries.values().map(|entry| &entry.spec).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTool, ToolCallRecorder};

    #[test]
    fn register_rejects_duplicate_names() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(ScriptedTool::new("probe", Vec::new(), &recorder)))
            .expect("first registration");

        let err = registry
            .register(Box::new(ScriptedTool::new("probe", Vec::new(), &recorder)))
            .unwrap_err();
        assert_eq!(err, DuplicateToolError { name: "probe".to_string() });
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_exposes_declared_contract() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        let tool =
            ScriptedTool::new("probe", Vec::new(), &recorder).with_required_input("target");
        registry.register(Box::new(tool)).expect("register");

        let spec = registry.lookup("probe").expect("spec");
        assert_eq!(spec.name, "probe");
        assert!(spec.required_inputs.contains("target"));
        assert!(registry.lookup("absent").is_none());
    }

    #[test]
    fn all_returns_specs_in_name_order() {
        let recorder = ToolCallRecorder::new();
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(Box::new(ScriptedTool::new(name, Vec::new(), &recorder)))
                .expect("register");
        }

        let names: Vec<&str> = registry.all().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn exit_status_success_only_for_code_zero() {
        assert!(ExitStatus::Code(0).success());
        assert!(!ExitStatus::Code(1).success());
        assert!(!ExitStatus::Code(-1).success());
        assert!(!ExitStatus::Signal(9).success());
    }

    #[test]
    fn default_predict_describes_schema_and_inputs() {
        struct Probe;
        impl Tool for Probe {
            fn name(&self) -> &str {
                "probe"
            }
            fn required_inputs(&self) -> BTreeSet<String> {
                BTreeSet::new()
            }
            fn output_schema(&self) -> Option<String> {
                Some("a list of findings".to_string())
            }
            fn execute(&self, _: &ToolInputs, _: &InvocationLimits) -> Result<ToolOutput> {
                unreachable!("not executed in this test")
            }
        }

        let inputs = ToolInputs::from([("target".to_string(), "src/".to_string())]);
        let effect = Probe.predict(&inputs).expect("predict");
        assert_eq!(effect, "probe: a list of findings (inputs: target)");
    }
}
