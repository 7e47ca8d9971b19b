//! The deciding loop around attempts.
//!
//! Drives plan, validate, simulate, execute, reflect until the goal is met
//! or a limit trips. Feedback flows to the next attempt through the run log;
//! nothing else is carried between attempts.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument};

use crate::attempt::{AttemptContext, AttemptRecord, run_attempt};
use crate::core::decision::{Decision, DecisionLimits, decide};
use crate::core::run_log::RunLog;
use crate::core::types::AttemptDisposition;
use crate::io::config::EngineConfig;
use crate::io::oracle::PlanOracle;
use crate::tool::ToolRegistry;

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleStop {
    /// Some attempt fully succeeded.
    Succeeded { attempt: u32 },
    /// The attempt cap was reached without success.
    Exhausted { attempts: u32 },
    /// The oracle kept producing unparseable output.
    PlannerUnusable {
        attempts: u32,
        consecutive_parse_failures: u32,
    },
}

/// Final state of a run.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleOutcome {
    pub goal: String,
    /// Attempts consumed, including the one that stopped the run.
    pub attempts: u32,
    pub stop: LifecycleStop,
    /// Full feedback history, one entry per attempt.
    pub log: RunLog,
}

/// Run the full lifecycle for `goal`.
///
/// `on_attempt` fires after each attempt is decided, in order; callers hang
/// artifact persistence and progress reporting off it. An `Err` means the
/// machinery itself broke, never that the goal was missed; inspect
/// [`LifecycleOutcome::stop`] for that.
#[instrument(skip_all, fields(max_attempts = config.max_attempts))]
pub fn run_lifecycle<O: PlanOracle, F: FnMut(&AttemptRecord)>(
    oracle: &O,
    goal: &str,
    registry: &ToolRegistry,
    config: &EngineConfig,
    mut on_attempt: F,
) -> Result<LifecycleOutcome> {
    config.validate()?;
    let ctx = AttemptContext {
        goal,
        registry,
        config,
    };
    let limits = DecisionLimits {
        max_attempts: config.max_attempts,
        parse_failure_limit: config.parse_failure_limit,
    };
    let mut log = RunLog::new();
    let mut consecutive_parse_failures = 0u32;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let record = run_attempt(oracle, attempt, &ctx, &mut log)?;
        consecutive_parse_failures = match record.disposition {
            AttemptDisposition::ParseFailure { .. } => consecutive_parse_failures + 1,
            _ => 0,
        };
        let decision = decide(
            &record.disposition,
            attempt,
            consecutive_parse_failures,
            &limits,
        );
        info!(attempt, decision = ?decision, "attempt decided");
        on_attempt(&record);

        let stop = match decision {
            Decision::Replan => continue,
            Decision::Succeed => LifecycleStop::Succeeded { attempt },
            Decision::Exhausted => LifecycleStop::Exhausted { attempts: attempt },
            Decision::PlannerUnusable { consecutive } => LifecycleStop::PlannerUnusable {
                attempts: attempt,
                consecutive_parse_failures: consecutive,
            },
        };
        return Ok(LifecycleOutcome {
            goal: goal.to_string(),
            attempts: attempt,
            stop,
            log,
        });
    }
}
