//! Attempt artifact persistence under `.planloop/runs/`.
//!
//! One directory per attempt, one file per lifecycle stage. The engine never
//! reads these back; they exist for humans and tooling to replay a run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use crate::attempt::AttemptRecord;

#[derive(Debug, Clone)]
pub struct AttemptPaths {
    pub dir: PathBuf,
    pub oracle_path: PathBuf,
    pub plan_path: PathBuf,
    pub diagnostics_path: PathBuf,
    pub simulation_path: PathBuf,
    pub execution_path: PathBuf,
    pub feedback_path: PathBuf,
}

impl AttemptPaths {
    pub fn new(root: &Path, run_id: &str, attempt: u32) -> Self {
        let dir = root
            .join(".planloop")
            .join("runs")
            .join(run_id)
            .join(format!("attempt-{attempt}"));
        Self {
            dir: dir.clone(),
            oracle_path: dir.join("oracle.txt"),
            plan_path: dir.join("plan.json"),
            diagnostics_path: dir.join("diagnostics.json"),
            simulation_path: dir.join("simulation.json"),
            execution_path: dir.join("execution.json"),
            feedback_path: dir.join("feedback.json"),
        }
    }
}

/// Persist one attempt's artifacts.
///
/// Stages the attempt never reached (raw oracle text on an oracle failure,
/// execution on a rejected plan) skip their files.
pub fn write_attempt(root: &Path, run_id: &str, record: &AttemptRecord) -> Result<AttemptPaths> {
    let paths = AttemptPaths::new(root, run_id, record.attempt);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create attempt dir {}", paths.dir.display()))?;

    // Write in deterministic order to keep artifacts stable.
    if let Some(raw) = &record.raw_oracle_output {
        write_text(&paths.oracle_path, raw)?;
    }
    if let Some(plan) = &record.plan {
        write_json(&paths.plan_path, plan)?;
    }
    write_json(&paths.diagnostics_path, &record.diagnostics)?;
    write_json(&paths.simulation_path, &record.simulations)?;
    if let Some(report) = &record.execution {
        write_json(&paths.execution_path, report)?;
    }
    write_json(&paths.feedback_path, &record.feedback)?;

    Ok(paths)
}

/// Allocate a run id no existing run directory uses.
pub fn new_run_id(root: &Path) -> Result<String> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?
        .as_secs();
    let base = format!("run-{secs}");
    let runs = root.join(".planloop").join("runs");

    for suffix in 1..=999u32 {
        let id = if suffix == 1 {
            base.clone()
        } else {
            format!("{base}-{suffix}")
        };
        if !runs.join(&id).exists() {
            return Ok(id);
        }
    }

    Err(anyhow!("unable to generate unique run id from base '{base}'"))
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    write_text(path, &buf)
}
